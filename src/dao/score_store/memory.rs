//! In-memory JSON tree implementing [`ScoreStore`], used when no remote database is
//! configured and as the substitute backend in tests.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::{
    RwLock,
    broadcast::{self, error::RecvError},
    mpsc,
};
use tracing::debug;

use crate::dao::storage::{StorageError, StorageResult};

use super::{ScoreStore, Subscription, path_segments};

const CHANGE_CAPACITY: usize = 64;
const SUBSCRIPTION_CAPACITY: usize = 16;

/// Shared JSON tree with change notifications.
#[derive(Clone)]
pub struct MemoryScoreStore {
    inner: Arc<Inner>,
}

struct Inner {
    tree: RwLock<Value>,
    changes: broadcast::Sender<()>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Default for MemoryScoreStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScoreStore {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::with_tree(Value::Null)
    }

    /// Create a store seeded with `tree` as its root value.
    pub fn with_tree(tree: Value) -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(tree),
                changes,
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Number of subscriptions this store is still feeding.
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    /// Make subsequent reads (and subscription registrations) fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes and deletions fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    async fn value_at(inner: &Inner, path: &str) -> Option<Value> {
        let tree = inner.tree.read().await;
        let mut cursor = &*tree;
        for segment in path_segments(path) {
            cursor = cursor.get(segment)?;
        }
        (!cursor.is_null()).then(|| cursor.clone())
    }

    async fn set_at(inner: &Inner, path: &str, value: Value) {
        {
            let mut tree = inner.tree.write().await;
            let segments: Vec<&str> = path_segments(path).collect();
            match segments.split_last() {
                None => *tree = value,
                Some((last, parents)) => {
                    let mut cursor = &mut *tree;
                    for segment in parents {
                        cursor = ensure_object(cursor)
                            .entry((*segment).to_string())
                            .or_insert(Value::Null);
                    }
                    let object = ensure_object(cursor);
                    if value.is_null() {
                        object.remove(*last);
                    } else {
                        object.insert((*last).to_string(), value);
                    }
                }
            }
        }
        let _ = inner.changes.send(());
    }

    fn check(flag: &AtomicBool, operation: &str, path: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                format!("in-memory {operation} of `{path}` rejected"),
                io::Error::other("injected failure"),
            ));
        }
        Ok(())
    }
}

/// Coerce `value` into an object, discarding any scalar previously stored there.
fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

impl ScoreStore for MemoryScoreStore {
    fn read(&self, path: &str) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let inner = self.inner.clone();
        let path = path.to_string();
        Box::pin(async move {
            Self::check(&inner.fail_reads, "read", &path)?;
            Ok(Self::value_at(&inner, &path).await)
        })
    }

    fn subscribe(&self, path: &str) -> BoxFuture<'static, StorageResult<Subscription>> {
        let inner = self.inner.clone();
        let path = path.to_string();
        Box::pin(async move {
            Self::check(&inner.fail_reads, "subscription", &path)?;

            // Register for changes before taking the first value so nothing is missed.
            let mut changes = inner.changes.subscribe();
            let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
            let task = tokio::spawn(async move {
                let initial = Self::value_at(&inner, &path).await;
                if tx.send(Ok(initial)).await.is_err() {
                    return;
                }
                loop {
                    match changes.recv().await {
                        Ok(()) | Err(RecvError::Lagged(_)) => {
                            let current = Self::value_at(&inner, &path).await;
                            if tx.send(Ok(current)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                debug!(path = %path, "in-memory subscription ended");
            });
            Ok(Subscription::new(rx, task))
        })
    }

    fn write(&self, path: &str, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let path = path.to_string();
        Box::pin(async move {
            Self::check(&inner.fail_writes, "write", &path)?;
            Self::set_at(&inner, &path, value).await;
            Ok(())
        })
    }

    fn delete(&self, path: &str) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let path = path.to_string();
        Box::pin(async move {
            Self::check(&inner.fail_writes, "delete", &path)?;
            Self::set_at(&inner, &path, Value::Null).await;
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn write_creates_intermediate_objects() {
        let store = MemoryScoreStore::new();
        store.write("a/b/c", json!(3)).await.unwrap();

        assert_eq!(store.read("a/b/c").await.unwrap(), Some(json!(3)));
        assert_eq!(store.read("").await.unwrap(), Some(json!({"a": {"b": {"c": 3}}})));
        assert_eq!(store.read("a/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_value() {
        let store = MemoryScoreStore::with_tree(json!({"competition": {"active": true}, "u1": 1}));
        store.delete("competition").await.unwrap();

        assert_eq!(store.read("competition").await.unwrap(), None);
        assert_eq!(store.read("").await.unwrap(), Some(json!({"u1": 1})));
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let store = MemoryScoreStore::new();
        store.set_fail_writes(true);
        assert!(store.write("x", json!(1)).await.is_err());
        assert!(store.delete("x").await.is_err());

        store.set_fail_reads(true);
        assert!(store.read("x").await.is_err());
        assert!(store.subscribe("x").await.is_err());
    }

    #[tokio::test]
    async fn subscription_delivers_current_value_then_changes() {
        let store = MemoryScoreStore::with_tree(json!({"u1": {"TotalScore": 1}}));
        let mut subscription = store.subscribe("").await.unwrap();

        let first = subscription.next().await.unwrap().unwrap();
        assert_eq!(first, Some(json!({"u1": {"TotalScore": 1}})));

        store.write("u1/TotalScore", json!(5)).await.unwrap();
        let second = subscription.next().await.unwrap().unwrap();
        assert_eq!(second, Some(json!({"u1": {"TotalScore": 5}})));
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_feeding() {
        let store = MemoryScoreStore::new();
        let subscription = store.subscribe("").await.unwrap();
        subscription.cancel();

        for _ in 0..100 {
            if store.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.subscriber_count(), 0);

        // Writes after cancellation must not block on the dead feed.
        store.write("u1", json!({"TotalScore": 1})).await.unwrap();
    }
}
