//! Error taxonomy for the tree core (see `spec.md` §7): programming errors
//! that must be reported to the caller as typed errors (corrupt store
//! payloads), as opposed to the invariant violations below that remain
//! `panic!`s because no caller could plausibly recover from them.

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("backing store returned unexpected payload length {0} for this variant")]
    UnexpectedPayloadLength(usize),
    #[error("backing store has no entry for digest referenced by the tree")]
    MissingNode,
    #[error("zero-hash ladder not initialized for this store")]
    LadderNotInitialized,
    #[error("cannot fit two values into one slot at depth 256")]
    DepthExhausted,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("lmdb error: {0}")]
    Lmdb(#[from] lmdb::Error),
}
