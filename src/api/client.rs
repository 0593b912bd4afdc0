use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::{Host, Url};

use crate::util::strip_control_chars;

/// Response bodies larger than this are rejected mid-stream.
pub const MAX_RESPONSE_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Characters of a non-2xx body kept for the operator-facing message.
const ERROR_DETAIL_CHARS: usize = 160;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Store returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// True if the failure is transient and a read may be retried.
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Decode(_) | ApiError::ResponseTooLarge(_) | ApiError::InvalidBaseUrl(_) => {
                false
            }
        }
    }
}

/// Shared HTTP client for the catalog and gallery services.
///
/// Owns the base URL, the optional bearer token, and the per-request timeout.
/// Endpoint wrappers live in `api::categories` and `api::gallery`; this type
/// only knows how to send a request and police the response.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<SecretString>,
    timeout: Duration,
}

impl ApiClient {
    /// Builds a client for the service at `base_url`.
    ///
    /// The URL must be http(s) with a host. A bearer token sent over plain
    /// HTTP to a non-loopback host is allowed but logged loudly, since some
    /// deployments terminate TLS in front of the service.
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base =
            Url::parse(base_url.trim()).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ApiError::InvalidBaseUrl(format!(
                    "unsupported scheme '{other}' (expected http or https)"
                )))
            }
        }
        if base.host_str().is_none() {
            return Err(ApiError::InvalidBaseUrl("missing host".to_owned()));
        }

        if token.is_some() && base.scheme() == "http" && !is_loopback(&base) {
            tracing::warn!(base_url = %base, "API token will be sent over plain HTTP");
        }

        let http = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base,
            token,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `base + segments`, percent-encoding each segment. Identifiers
    /// are opaque strings, so they must never be spliced into a path raw.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Scheme was validated in `new`, so the URL always supports path segments.
        if let Ok(mut parts) = url.path_segments_mut() {
            parts.pop_if_empty().extend(segments.iter().copied());
        }
        url
    }

    /// Sends a JSON request and decodes a JSON response.
    ///
    /// `retry` must only be set for read requests: retried calls back off
    /// 1s/2s/4s on network errors and 5xx, which would duplicate a
    /// non-idempotent mutation.
    pub(crate) async fn request_json<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        retry: bool,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut retry_count = 0;
        loop {
            let response = match self.send_once(method.clone(), segments, body).await {
                Ok(response) => response,
                Err(e) if retry && e.is_retryable() && retry_count < MAX_RETRIES => {
                    let delay = 1u64 << retry_count; // 1s, 2s, 4s
                    tracing::debug!(
                        error = %e,
                        retry = retry_count + 1,
                        delay_secs = delay,
                        "Retrying read after transient error"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let bytes = read_limited(response, MAX_RESPONSE_SIZE).await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
    }

    /// Sends a request whose response body is irrelevant (e.g. DELETE).
    /// Never retried.
    pub(crate) async fn request_empty<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send_once(method, segments, body).await?;
        // Drain within the size cap so the connection can be reused.
        read_limited(response, MAX_RESPONSE_SIZE).await?;
        Ok(())
    }

    /// Sends a multipart form and decodes a JSON response. Never retried:
    /// multipart bodies are consumed on send and uploads are not idempotent.
    pub(crate) async fn post_multipart<T>(
        &self,
        segments: &[&str],
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments);
        let request = self.authorize(self.http.post(url)).multipart(form);
        let response = self.dispatch(request).await?;
        let bytes = read_limited(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_once<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments);
        let mut request = self.authorize(self.http.request(method, url));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.dispatch(request).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))?
            .map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response)
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        // Limit to 3 redirects
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        // Detect loops
        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Summarizes a non-2xx body for display: prefers the service's `message`
/// field, falls back to the raw text, and always sanitizes and shortens.
async fn error_detail(response: reqwest::Response) -> String {
    let bytes = match read_limited(response, MAX_RESPONSE_SIZE).await {
        Ok(bytes) => bytes,
        Err(_) => return "unreadable response body".to_owned(),
    };
    let text = String::from_utf8_lossy(&bytes);

    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));
    let raw = message.unwrap_or_else(|| text.into_owned());

    let clean = strip_control_chars(&raw);
    let trimmed = clean.trim();
    if trimmed.is_empty() {
        return "no detail".to_owned();
    }
    let mut out: String = trimmed.chars().take(ERROR_DETAIL_CHARS).collect();
    if trimmed.chars().count() > ERROR_DETAIL_CHARS {
        out.push_str("...");
    }
    out
}

async fn read_limited(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
