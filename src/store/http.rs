use crate::store::client::StoreClient;
use crate::store::error::{StoreError, StoreResult};
use crate::store::response::{ClusterHealth, RawSearchResponse};
use crate::tenants::{Credentials, EnvironmentConfig};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff step between retries; attempt `n` waits `n` steps
const RETRY_BACKOFF_MS: u64 = 100;

/// Document store client speaking the Elasticsearch/OpenSearch REST API
pub struct HttpStoreClient {
    client: Client,
    endpoint: String,
    /// `endpoint` without userinfo, used in logs and reports
    display_endpoint: String,
    credentials: Credentials,
    max_retries: u32,
    timeout_ms: u64,
    closed: AtomicBool,
}

impl HttpStoreClient {
    /// Create a client for one environment
    pub fn new(environment: &EnvironmentConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(environment.request_timeout_ms))
            .user_agent(concat!("llm-log-insights/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::ClientBuild(e.to_string()))?;

        let endpoint = environment.endpoint.trim().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            display_endpoint: redact_userinfo(&endpoint),
            endpoint,
            credentials: environment.credentials.clone(),
            max_retries: environment.max_retries,
            timeout_ms: environment.request_timeout_ms,
            closed: AtomicBool::new(false),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::ApiKey(key) => request.header("Authorization", format!("ApiKey {}", key)),
            Credentials::UsernamePassword { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::None => request,
        }
    }

    fn map_transport(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(self.timeout_ms)
        } else {
            // without_url keeps credentials embedded in URLs out of the message
            StoreError::Transport(err.without_url().to_string())
        }
    }

    /// Send a request, retrying transport failures, 429 and 5xx up to `max_retries` times
    async fn send_with_retry<F>(&self, build: F) -> StoreResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(StoreError::Closed);
            }

            let err = match self.authorize(build()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    StoreError::status(status, body)
                }
                Err(e) => self.map_transport(e),
            };

            if !err.is_retryable() || attempt >= self.max_retries {
                return Err(err);
            }

            attempt += 1;
            warn!(
                endpoint = %self.display_endpoint,
                attempt,
                max_retries = self.max_retries,
                error = %err,
                "Retrying store request"
            );
            tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.without_url().to_string()))
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn search(&self, indices: &[String], body: &Value) -> StoreResult<RawSearchResponse> {
        let target = if indices.is_empty() {
            "_all".to_string()
        } else {
            indices.join(",")
        };
        let url = format!("{}/{}/_search", self.endpoint, target);
        debug!(endpoint = %self.display_endpoint, target = %target, "Executing store search");

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .query(&[("ignore_unavailable", "true"), ("allow_no_indices", "true")])
                    .json(body)
            })
            .await?;

        Self::decode(response).await
    }

    async fn health(&self) -> StoreResult<ClusterHealth> {
        let url = format!("{}/_cluster/health", self.endpoint);
        let response = self.send_with_retry(|| self.client.get(&url)).await?;
        Self::decode(response).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        debug!(endpoint = %self.display_endpoint, "Store client closed");
    }

    fn endpoint(&self) -> &str {
        &self.display_endpoint
    }
}

/// Drop any `user:password@` part of an endpoint
pub fn redact_userinfo(endpoint: &str) -> String {
    match Url::parse(endpoint) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        _ => endpoint.to_string(),
    }
}
