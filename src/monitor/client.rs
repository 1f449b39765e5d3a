//! Scheduled query rules REST client.
//!
//! [`ScheduledQueryRulesApi`] is the seam the lifecycle handlers depend on.
//! [`ScheduledQueryRulesClient`] implements it over HTTP with:
//!
//! - Bearer token authentication
//! - Retries with linear backoff for throttling (429) and server errors (5xx)
//! - `Retry-After` awareness
//! - ARM error envelope decoding for readable messages
//!
//! The client holds no per-call mutable state and can be shared behind an
//! `Arc` by any number of concurrent callers.

use super::models::{ErrorResponse, LogSearchRuleResource, API_VERSION};
use crate::config::AzureConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default maximum number of retries
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default retry delay in milliseconds
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Upper bound for a server-requested `Retry-After`, in seconds
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Errors returned by the scheduled query rules API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The rule does not exist (HTTP 404).
    #[error("resource not found")]
    NotFound,

    /// The request conflicts with the current state (HTTP 409).
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Any other unsuccessful status.
    #[error("unexpected status {code}: {message}")]
    Status { code: u16, message: String },

    /// Transport failure or invalid request.
    #[error("HTTP request failed: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Credentials were rejected (HTTP 401/403).
    #[error("authentication failed: {message}")]
    Auth { message: String },
}

impl ApiError {
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            source: None,
        }
    }

    pub fn http_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Http {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for a 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Worth retrying at the transport level.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::Http { .. } => true,
            _ => false,
        }
    }
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Operations on `Microsoft.Insights/scheduledQueryRules`.
#[async_trait]
pub trait ScheduledQueryRulesApi: Send + Sync {
    /// Subscription every request is scoped to.
    fn subscription_id(&self) -> &str;

    /// Create the rule or replace it in full.
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        rule: &LogSearchRuleResource,
    ) -> ApiResult<LogSearchRuleResource>;

    /// Fetch the rule; [`ApiError::NotFound`] when it does not exist.
    async fn get(&self, resource_group: &str, name: &str) -> ApiResult<LogSearchRuleResource>;

    /// Delete the rule; [`ApiError::NotFound`] when it does not exist.
    async fn delete(&self, resource_group: &str, name: &str) -> ApiResult<()>;
}

/// Configuration for [`ScheduledQueryRulesClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Resource Manager endpoint
    pub endpoint: String,
    pub subscription_id: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Base retry delay (multiplied by the attempt number)
    pub retry_delay: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::config::DEFAULT_ARM_ENDPOINT.to_string(),
            subscription_id: String::new(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            user_agent: format!("azmon-rules/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for creating a [`ScheduledQueryRulesClient`]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.config.subscription_id = subscription_id.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn build(self) -> ApiResult<ScheduledQueryRulesClient> {
        ScheduledQueryRulesClient::from_config(self.config)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP implementation of [`ScheduledQueryRulesApi`]
pub struct ScheduledQueryRulesClient {
    client: Client,
    endpoint: Url,
    config: ClientConfig,
}

impl ScheduledQueryRulesClient {
    /// Create a client from the `[azure]` configuration section.
    pub fn new(azure: &AzureConfig) -> ApiResult<Self> {
        let mut builder = Self::builder()
            .endpoint(azure.endpoint.clone())
            .subscription_id(azure.subscription_id.clone().unwrap_or_default())
            .timeout(azure.request_timeout)
            .max_retries(azure.max_retries)
            .retry_delay(azure.retry_delay);
        if let Some(token) = &azure.access_token {
            builder = builder.token(token.clone());
        }
        builder.build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    fn from_config(config: ClientConfig) -> ApiResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| ApiError::http_with_source(format!("Invalid endpoint '{}'", config.endpoint), e))?;
        if endpoint.cannot_be_a_base() {
            return Err(ApiError::http(format!("Invalid endpoint '{}'", config.endpoint)));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ApiError::http_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// URL of a single rule.
    pub fn rule_url(&self, resource_group: &str, name: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "subscriptions",
                self.config.subscription_id.as_str(),
                "resourceGroups",
                resource_group,
                "providers",
                "Microsoft.Insights",
                "scheduledQueryRules",
                name,
            ]);
        }
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        url
    }

    /// Send a request, retrying throttled and failed attempts.
    ///
    /// Returns successful responses only; every other outcome is mapped to
    /// an [`ApiError`].
    async fn request_with_retry(
        &self,
        method: Method,
        url: &Url,
        body: Option<&LogSearchRuleResource>,
    ) -> ApiResult<Response> {
        let mut retry_count = 0;

        loop {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(token) = &self.config.token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let retry_after = retry_after(&response);
                    let error = error_from_response(response).await;
                    if let (Some(secs), true) = (retry_after, retry_count < self.config.max_retries) {
                        warn!("Rate limited, retry after {} seconds", secs);
                        tokio::time::sleep(Duration::from_secs(secs)).await;
                        retry_count += 1;
                        continue;
                    }
                    error
                }
                Err(e) if e.is_timeout() => ApiError::http_with_source(
                    format!("Request to '{}' timed out after {:?}", url, self.config.timeout),
                    e,
                ),
                Err(e) => ApiError::http_with_source(format!("{} {} failed", method, url), e),
            };

            if !error.is_retryable() || retry_count >= self.config.max_retries {
                return Err(error);
            }

            retry_count += 1;
            let delay = self.config.retry_delay * retry_count;
            debug!(
                "Retry {}/{} for {} {} after {:?}: {}",
                retry_count, self.config.max_retries, method, url, delay, error
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ScheduledQueryRulesApi for ScheduledQueryRulesClient {
    fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        rule: &LogSearchRuleResource,
    ) -> ApiResult<LogSearchRuleResource> {
        let url = self.rule_url(resource_group, name);
        let response = self.request_with_retry(Method::PUT, &url, Some(rule)).await?;
        decode(response).await
    }

    async fn get(&self, resource_group: &str, name: &str) -> ApiResult<LogSearchRuleResource> {
        let url = self.rule_url(resource_group, name);
        let response = self.request_with_retry(Method::GET, &url, None).await?;
        decode(response).await
    }

    async fn delete(&self, resource_group: &str, name: &str) -> ApiResult<()> {
        let url = self.rule_url(resource_group, name);
        self.request_with_retry(Method::DELETE, &url, None).await?;
        Ok(())
    }
}

async fn decode(response: Response) -> ApiResult<LogSearchRuleResource> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::http_with_source("Failed to read response body", e))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Seconds to wait before retrying a throttled request, `None` when the
/// response is not throttled.
fn retry_after(response: &Response) -> Option<u64> {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    let secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1);
    Some(secs.min(MAX_RETRY_AFTER_SECS))
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error_for_status(status, &body)
}

/// Map an unsuccessful status and body to an [`ApiError`].
pub fn error_for_status(status: StatusCode, body: &str) -> ApiError {
    let message = error_message(status, body);
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::CONFLICT => ApiError::Conflict { message },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth { message },
        _ => ApiError::Status {
            code: status.as_u16(),
            message,
        },
    }
}

/// Prefer the ARM `error.message`, fall back to the raw body, then the
/// status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error);
    if let Some(detail) = detail {
        match (detail.code, detail.message) {
            (Some(code), Some(message)) => return format!("{}: {}", code, message),
            (None, Some(message)) => return message,
            _ => {}
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}
