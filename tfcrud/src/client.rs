//! REST backend abstraction and its reqwest implementation

use crate::error::BackendError;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

/// Something that can execute a mapped request. Implementations return
/// `Ok` only for 2xx answers and must not retry on their own.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError> {
        (**self).execute(request).await
    }
}

/// How requests are authenticated
#[derive(Clone)]
pub enum Auth {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// Token sent verbatim in a custom header
    ApiKey { header: String, key: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer(***)"),
            Auth::ApiKey { header, .. } => write!(f, "ApiKey({}: ***)", header),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_idle_connections: usize,
    pub idle_timeout: Duration,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
    pub insecure: bool,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 10,
            idle_timeout: Duration::from_secs(90),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(30)),
            insecure: false,
            user_agent: format!("tfcrud/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub last_request: Option<Instant>,
}

/// reqwest-backed [`Backend`]
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: (HeaderName, HeaderValue),
    config: ClientConfig,
    stats: RwLock<ConnectionStats>,
}

impl HttpBackend {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, auth: Auth) -> Result<Self, BackendError> {
        Self::with_config(endpoint, auth, ClientConfig::default())
    }

    pub fn with_config(
        endpoint: &str,
        auth: Auth,
        config: ClientConfig,
    ) -> Result<Self, BackendError> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                endpoint
            )));
        }
        let base_url = endpoint.trim_end_matches('/').to_string();

        let auth_header = match auth {
            Auth::Bearer(token) => (AUTHORIZATION, header_value(&format!("Bearer {}", token))?),
            Auth::ApiKey { header, key } => (
                HeaderName::from_bytes(header.as_bytes())
                    .map_err(|e| BackendError::InvalidUrl(format!("auth header name: {}", e)))?,
                header_value(&key)?,
            ),
        };

        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.request_timeout)
            .connect_timeout(config.connection_timeout)
            .pool_idle_timeout(config.idle_timeout)
            .pool_max_idle_per_host(config.max_idle_connections);

        if let Some(keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        let http_client = builder.build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth_header,
                config,
                stats: RwLock::new(ConnectionStats::default()),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub async fn get_connection_stats(&self) -> ConnectionStats {
        self.inner.stats.read().await.clone()
    }

    async fn record_request(&self, success: bool) {
        let mut stats = self.inner.stats.write().await;
        stats.total_requests += 1;
        if !success {
            stats.failed_requests += 1;
        }
        stats.last_request = Some(Instant::now());
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, BackendError> {
    let mut value = HeaderValue::from_str(raw)
        .map_err(|e| BackendError::InvalidUrl(format!("auth header value: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError> {
        let url = format!("{}{}", self.inner.base_url, request.path);

        tracing::debug!("{} request to: {}", request.method, url);

        let (header_name, header_value) = &self.inner.auth_header;
        let mut builder = self
            .inner
            .http_client
            .request(request.method.clone(), &url)
            .header(header_name, header_value)
            .header(USER_AGENT, &self.inner.config.user_agent);

        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                self.record_request(false).await;
                if e.is_timeout() {
                    return Err(BackendError::Timeout(
                        self.inner.config.request_timeout.as_secs(),
                    ));
                }
                return Err(BackendError::Request(e));
            }
        };

        let status = response.status();
        tracing::debug!("{} {} answered {}", request.method, request.path, status.as_u16());

        if status.is_success() {
            // a body cut off mid-transfer is a transport failure, not a bad payload
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    self.record_request(false).await;
                    return Err(BackendError::Request(e));
                }
            };
            self.record_request(true).await;
            return Ok(ApiResponse::new(status.as_u16(), body));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        self.record_request(false).await;
        Err(BackendError::from_status(status.as_u16(), body))
    }
}
