//! HTTP transport for [`ElasticClient`]
//!
//! Calls are blocking `ureq` requests. Each one runs on tokio's blocking
//! pool so the future handed back to the sequence can be spawned like any
//! other.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sift_core::{Batch, Error, RemoteConfig, Result, ScrollRequest, SearchRequest};
use sift_engine::{BoxFuture, SearchClient};
use tracing::{debug, warn};

use crate::wire;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    Post,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

struct Inner {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
}

/// [`SearchClient`] speaking the Elasticsearch REST API
#[derive(Clone)]
pub struct ElasticClient {
    inner: Arc<Inner>,
}

impl ElasticClient {
    /// Client for `endpoint` (e.g. `http://localhost:9200`) with a 30s request timeout
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::build(endpoint.into(), None, Duration::from_secs(30))
    }

    /// Client from the `[remote]` section of the configuration
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::build(
            config.endpoint.clone(),
            config.api_key.clone(),
            config.timeout(),
        )
    }

    /// Builder: authenticate with an API key
    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        let inner = &self.inner;
        ElasticClient {
            inner: Arc::new(Inner {
                agent: inner.agent.clone(),
                endpoint: inner.endpoint.clone(),
                api_key: Some(api_key.into()),
            }),
        }
    }

    /// Base URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    fn build(endpoint: String, api_key: Option<String>, timeout: Duration) -> Self {
        // Error statuses carry the reason in the body, so they are read, not raised.
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        ElasticClient {
            inner: Arc::new(Inner {
                agent: ureq::Agent::new_with_config(config),
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key,
            }),
        }
    }

    /// Run `call` on the blocking pool of the runtime polling the future
    fn spawn<T, C>(&self, call: C) -> BoxFuture<Result<T>>
    where
        T: Send + 'static,
        C: FnOnce(&Inner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || call(&inner))
                .await
                .map_err(|e| Error::transport(format!("request task failed: {}", e)))?
        })
    }
}

impl Inner {
    /// Send a JSON body and return the status with the raw response text
    fn send(&self, method: Method, path: &str, body: &Value) -> Result<(u16, String)> {
        let url = format!("{}{}", self.endpoint, path);
        let bytes = serde_json::to_vec(body)
            .map_err(|e| Error::transport(format!("failed to serialize request: {}", e)))?;
        debug!(target: "sift::elastic", method = method.as_str(), url = %url, "Sending request");

        let auth = self.api_key.as_ref().map(|key| format!("ApiKey {}", key));
        let result = match method {
            Method::Post => {
                let mut request = self
                    .agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json");
                if let Some(auth) = &auth {
                    request = request.header("Authorization", auth);
                }
                request.send(&bytes[..])
            }
            Method::Delete => {
                let mut request = self
                    .agent
                    .delete(url.as_str())
                    .force_send_body()
                    .header("Content-Type", "application/json");
                if let Some(auth) = &auth {
                    request = request.header("Authorization", auth);
                }
                request.send(&bytes[..])
            }
        };

        let mut response = result.map_err(|e| Error::transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::transport(format!("failed to read response: {}", e)))?;
        Ok((status, text))
    }

    fn fetch(&self, path: &str, body: &Value, page: Option<(usize, usize)>) -> Result<Batch> {
        let (status, text) = self.send(Method::Post, path, body)?;
        if !(200..300).contains(&status) {
            let err = wire::classify_error(status, &text, page);
            warn!(target: "sift::elastic", status, path, error = %err, "Search rejected");
            return Err(err);
        }
        let response: Value = serde_json::from_str(&text)?;
        wire::parse_batch(&response)
    }
}

impl SearchClient for ElasticClient {
    fn search(&self, request: SearchRequest) -> BoxFuture<Result<Batch>> {
        let path = wire::search_path(&request);
        let body = wire::search_body(&request);
        let page = Some((request.from, request.size));
        self.spawn(move |inner| inner.fetch(&path, &body, page))
    }

    fn scroll(&self, request: ScrollRequest) -> BoxFuture<Result<Batch>> {
        let body = wire::scroll_body(&request);
        self.spawn(move |inner| inner.fetch("/_search/scroll", &body, None))
    }

    fn clear_scroll(&self, scroll_id: String) -> BoxFuture<Result<bool>> {
        let body = wire::clear_scroll_body(&scroll_id);
        self.spawn(move |inner| {
            let (status, text) = inner.send(Method::Delete, "/_search/scroll", &body)?;
            // An unknown id is answered with 404 and `num_freed: 0`.
            if !(200..300).contains(&status) && status != 404 {
                let err = wire::classify_error(status, &text, None);
                warn!(target: "sift::elastic", status, error = %err, "Clear scroll rejected");
                return Err(err);
            }
            let response: Value = serde_json::from_str(&text)?;
            Ok(wire::parse_cleared(&response))
        })
    }
}
