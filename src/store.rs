//! The backing store: an opaque `digest -> bytes` mapping consumed by the
//! tree core (`spec.md` §4.2, §6). Two implementations are provided: an
//! in-memory reference store used by the crate's own tests, and an
//! LMDB-backed store built the way the teacher's `LmdbStorage` builds one.

use crate::error::StoreError;
use crate::hash::Digest;
use lmdb::{Cursor as _, Environment, EnvironmentFlags, Transaction as _, WriteFlags};
use std::collections::HashMap;
use std::path::Path;

/// Digest-keyed byte store. `get`/`put`/`delete` counters are
/// observability-only and never affect correctness (`spec.md` §4.2).
///
/// Callers must serialize mutation of a single store across threads; the
/// core performs many `put`s per `update` and assumes no concurrent writer
/// (`spec.md` §5).
pub trait BackingStore {
    fn get(&mut self, key: &Digest) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&mut self, key: Digest, value: Vec<u8>) -> Result<(), StoreError>;
    fn delete(&mut self, key: &Digest) -> Result<(), StoreError>;
    fn reads(&self) -> u64;
    fn writes(&self) -> u64;
}

/// Plain `HashMap`-backed store. The reference implementation of
/// [`BackingStore`]; mirrors the original Go `DB` struct's `kv` map plus its
/// `Reads`/`Writes` counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    kv: HashMap<Digest, Vec<u8>>,
    reads: u64,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of distinct digests currently stored. Unlike
    /// [`BackingStore::writes`] (a cumulative call counter per `spec.md`
    /// §4.2), this reflects the store's actual size and is what the
    /// Sharing property (`spec.md` §8, property 4) is about: re-inserting
    /// an identical `(key, value)` pair must add no new entries, even
    /// though it may still issue `put` calls that overwrite existing ones.
    pub fn entry_count(&self) -> usize {
        self.kv.len()
    }
}

impl BackingStore for MemoryStore {
    fn get(&mut self, key: &Digest) -> Result<Option<Vec<u8>>, StoreError> {
        self.reads += 1;
        Ok(self.kv.get(key).cloned())
    }

    fn put(&mut self, key: Digest, value: Vec<u8>) -> Result<(), StoreError> {
        self.writes += 1;
        self.kv.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &Digest) -> Result<(), StoreError> {
        self.kv.remove(key);
        Ok(())
    }

    fn reads(&self) -> u64 {
        self.reads
    }

    fn writes(&self) -> u64 {
        self.writes
    }
}

/// LMDB-backed store, built the way the teacher's `LmdbStorage` opens its
/// environment (`NO_SUB_DIR`, a single fixed map size, one database).
#[derive(Debug)]
pub struct LmdbStore {
    env: Environment,
    nodes_db: lmdb::Database,
    reads: u64,
    writes: u64,
}

impl LmdbStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let env = Environment::new()
            .set_flags(EnvironmentFlags::NO_SUB_DIR)
            .set_max_dbs(1)
            .set_map_size(1024 * 1024 * 1024) // 1GB
            .open(path.as_ref())
            .map_err(StoreError::Lmdb)?;

        let nodes_db = env
            .create_db(Some("nodes"), lmdb::DatabaseFlags::empty())
            .map_err(StoreError::Lmdb)?;

        Ok(Self {
            env,
            nodes_db,
            reads: 0,
            writes: 0,
        })
    }

    pub fn sync(&self) -> Result<(), StoreError> {
        self.env.sync(true).map_err(StoreError::Lmdb)
    }

    /// All entries currently stored, for diagnostics and tests. Not part of
    /// the external interface in `spec.md` §6 — the core never iterates.
    pub fn iter_entries(&self) -> Result<Vec<(Digest, Vec<u8>)>, StoreError> {
        let txn = self.env.begin_ro_txn().map_err(StoreError::Lmdb)?;
        let mut cursor = txn.open_ro_cursor(self.nodes_db).map_err(StoreError::Lmdb)?;
        let mut out = Vec::new();
        for (key, value) in cursor.iter() {
            let mut digest = [0u8; 32];
            digest.copy_from_slice(key);
            out.push((digest, value.to_vec()));
        }
        Ok(out)
    }
}

impl BackingStore for LmdbStore {
    fn get(&mut self, key: &Digest) -> Result<Option<Vec<u8>>, StoreError> {
        self.reads += 1;
        let txn = self.env.begin_ro_txn().map_err(StoreError::Lmdb)?;
        match txn.get(self.nodes_db, key) {
            Ok(data) => Ok(Some(data.to_vec())),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(StoreError::Lmdb(e)),
        }
    }

    fn put(&mut self, key: Digest, value: Vec<u8>) -> Result<(), StoreError> {
        self.writes += 1;
        let mut txn = self.env.begin_rw_txn().map_err(StoreError::Lmdb)?;
        txn.put(self.nodes_db, &key, &value, WriteFlags::empty())
            .map_err(StoreError::Lmdb)?;
        txn.commit().map_err(StoreError::Lmdb)
    }

    fn delete(&mut self, key: &Digest) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn().map_err(StoreError::Lmdb)?;
        match txn.del(self.nodes_db, key, None) {
            Ok(()) | Err(lmdb::Error::NotFound) => {}
            Err(e) => return Err(StoreError::Lmdb(e)),
        }
        txn.commit().map_err(StoreError::Lmdb)
    }

    fn reads(&self) -> u64 {
        self.reads
    }

    fn writes(&self) -> u64 {
        self.writes
    }
}
