/// Records persisted in the shared store.
pub mod models;
/// Shared key-value tree abstraction and its backends.
pub mod score_store;
/// Backend-neutral storage errors.
pub mod storage;
