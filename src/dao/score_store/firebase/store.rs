use std::sync::Arc;

use futures::{StreamExt, future::BoxFuture, pin_mut};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header::ACCEPT};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dao::{
    score_store::{ScoreStore, SnapshotUpdate, Subscription},
    storage::{StorageError, StorageResult},
};

use super::{
    config::FirebaseConfig,
    error::{FirebaseDaoError, FirebaseResult},
    stream::{FrameKind, frames},
};

const SUBSCRIPTION_CAPACITY: usize = 16;

/// [`ScoreStore`] backed by the Firebase Realtime Database REST API.
#[derive(Clone)]
pub struct FirebaseScoreStore {
    client: Client,
    base_url: Arc<str>,
    auth: Option<Arc<str>>,
}

impl FirebaseScoreStore {
    /// Build the HTTP client and check that the database answers.
    pub async fn connect(config: FirebaseConfig) -> FirebaseResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| FirebaseDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.database_url.trim_end_matches('/')),
            auth: config.auth.map(Arc::<str>::from),
        };

        store.ping().await?;
        Ok(store)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.auth {
            Some(ref auth) => builder.query(&[("auth", auth.as_ref())]),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> FirebaseResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| FirebaseDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(FirebaseDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }

    async fn get_value(&self, path: &str) -> FirebaseResult<Option<Value>> {
        let response = self.send(self.request(Method::GET, path), path).await?;
        let value = response
            .json::<Value>()
            .await
            .map_err(|source| FirebaseDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn put_value(&self, path: &str, value: &Value) -> FirebaseResult<()> {
        self.send(self.request(Method::PUT, path).json(value), path)
            .await
            .map(|_| ())
    }

    async fn delete_value(&self, path: &str) -> FirebaseResult<()> {
        match self.send(self.request(Method::DELETE, path), path).await {
            Ok(_) => Ok(()),
            // Deleting something that is already gone is not a failure.
            Err(FirebaseDaoError::RequestStatus { status, .. }) if status == StatusCode::NOT_FOUND => {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn ping(&self) -> FirebaseResult<()> {
        let builder = self
            .request(Method::GET, "")
            .query(&[("shallow", "true")]);
        self.send(builder, "").await.map(|_| ())
    }

    async fn open_stream(&self, path: &str) -> FirebaseResult<Response> {
        let builder = self
            .request(Method::GET, path)
            .header(ACCEPT, "text/event-stream");
        self.send(builder, path).await
    }

    /// Forward change notifications as full re-reads of `path` until the stream ends,
    /// the server closes it or the subscriber goes away.
    async fn pump(self, path: String, response: Response, tx: mpsc::Sender<SnapshotUpdate>) {
        let frames = frames(path.clone(), response);
        pin_mut!(frames);

        while let Some(frame) = frames.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(path = %path, error = %err, "Firebase stream read failed");
                    let _ = tx.send(Err(err.into())).await;
                    return;
                }
            };

            match frame.kind() {
                FrameKind::Changed => {
                    let update = self.get_value(&path).await.map_err(StorageError::from);
                    if tx.send(update).await.is_err() {
                        return;
                    }
                }
                FrameKind::KeepAlive => {}
                FrameKind::Closed => {
                    warn!(path = %path, event = %frame.event, "Firebase stream closed by server");
                    let closed = FirebaseDaoError::StreamClosed {
                        path: path.clone(),
                        event: frame.event,
                    };
                    let _ = tx.send(Err(closed.into())).await;
                    return;
                }
                FrameKind::Unknown => {
                    debug!(path = %path, event = %frame.event, "ignoring unknown Firebase stream event");
                }
            }
        }

        let _ = tx
            .send(Err(StorageError::SubscriptionClosed {
                path,
                reason: "stream ended".into(),
            }))
            .await;
    }
}

impl ScoreStore for FirebaseScoreStore {
    fn read(&self, path: &str) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        let path = path.to_string();
        Box::pin(async move { store.get_value(&path).await.map_err(Into::into) })
    }

    fn subscribe(&self, path: &str) -> BoxFuture<'static, StorageResult<Subscription>> {
        let store = self.clone();
        let path = path.to_string();
        Box::pin(async move {
            let response = store.open_stream(&path).await?;
            let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
            let task = tokio::spawn(store.pump(path, response, tx));
            Ok(Subscription::new(rx, task))
        })
    }

    fn write(&self, path: &str, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = path.to_string();
        Box::pin(async move { store.put_value(&path, &value).await.map_err(Into::into) })
    }

    fn delete(&self, path: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = path.to_string();
        Box::pin(async move { store.delete_value(&path).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(auth: Option<&str>) -> FirebaseScoreStore {
        FirebaseScoreStore {
            client: Client::new(),
            base_url: Arc::from("https://demo.firebaseio.com"),
            auth: auth.map(Arc::from),
        }
    }

    #[test]
    fn urls_append_json_suffix() {
        let store = store(None);
        assert_eq!(store.url(""), "https://demo.firebaseio.com/.json");
        assert_eq!(store.url("competition"), "https://demo.firebaseio.com/competition.json");
        assert_eq!(store.url("/a/b/"), "https://demo.firebaseio.com/a/b.json");
    }

    #[test]
    fn auth_is_sent_as_query_parameter() {
        let request = store(Some("secret"))
            .request(Method::GET, "competition")
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("auth=secret"));
    }
}
