/// Firebase Realtime Database backend.
#[cfg(feature = "firebase-store")]
pub mod firebase;
/// In-memory backend.
pub mod memory;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::dao::storage::StorageResult;

/// Value pushed by a live subscription: the full value at the watched path, `None` when empty.
pub type SnapshotUpdate = StorageResult<Option<Value>>;

/// Abstraction over the shared key-value tree holding participant records and competition state.
///
/// Paths are `/`-separated; the empty path designates the root of the tree.
pub trait ScoreStore: Send + Sync {
    /// One-shot read of the value stored at `path`.
    fn read(&self, path: &str) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    /// Register a live subscription on `path`. The current value is delivered first.
    fn subscribe(&self, path: &str) -> BoxFuture<'static, StorageResult<Subscription>>;
    /// Replace the value stored at `path`.
    fn write(&self, path: &str, value: Value) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove the value stored at `path`.
    fn delete(&self, path: &str) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Cancellable registration with a push-based data source.
///
/// The backend task feeding the subscription is aborted on [`Subscription::cancel`] or drop,
/// so no update is delivered after the handle is gone.
pub struct Subscription {
    updates: mpsc::Receiver<SnapshotUpdate>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Wrap the receiving end of a backend feed and the task producing it.
    pub fn new(updates: mpsc::Receiver<SnapshotUpdate>, task: JoinHandle<()>) -> Self {
        Self { updates, task }
    }

    /// Wait for the next pushed value. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<SnapshotUpdate> {
        self.updates.recv().await
    }

    /// Stop the backend feed.
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Split a store path into its non-empty segments.
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
