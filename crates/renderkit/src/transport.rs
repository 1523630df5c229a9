//! Transport seam
//!
//! The core never performs HTTP itself: it hands a fully-built
//! [`HttpRequest`] to a [`Transport`]. [`ReqwestTransport`] is the default
//! implementation; tests and hosts can plug in their own.

use crate::error::RenderError;
use crate::normalize::RawResponse;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// HTTP method used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Fully-resolved request for the transport
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Value for the `Authorization` header
    pub authorization: String,
    /// JSON body; `None` for GET
    pub body: Option<Map<String, Value>>,
    /// Response is a raw byte payload
    pub expect_binary: bool,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("authorization", &"Bearer <redacted>")
            .field("body", &self.body)
            .field("expect_binary", &self.expect_binary)
            .finish()
    }
}

impl HttpRequest {
    /// `Accept` header matching the expected payload
    pub fn accept(&self) -> &'static str {
        if self.expect_binary {
            "*/*"
        } else {
            "application/json"
        }
    }
}

/// Executes HTTP requests on behalf of the client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Send the request and return the raw payload
    ///
    /// Non-success statuses must surface as errors; binary requests return
    /// [`RawResponse::Bytes`], JSON requests return text or parsed JSON.
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, RenderError>;
}

/// Transport options
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// User-Agent of the HTTP client itself (not the rendered page)
    pub user_agent: Option<String>,
    /// Whole-request timeout; none by default
    pub timeout: Option<Duration>,
}

/// Default transport over reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given options
    pub fn new(options: &TransportOptions) -> Result<Self, RenderError> {
        let mut headers = HeaderMap::new();
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(RenderError::ClientBuildError)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn send(&self, request: HttpRequest) -> Result<RawResponse, RenderError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let authorization = HeaderValue::from_str(&request.authorization)
            .map_err(|_| RenderError::validation("API token contains invalid header characters"))?;

        let mut http_request = self
            .client
            .request(method, &request.url)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, request.accept());
        if let Some(body) = &request.body {
            http_request = http_request
                .header(CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = http_request
            .send()
            .await
            .map_err(RenderError::from_reqwest)?;

        let status = response.status();
        debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            "Received response"
        );

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RenderError::Api {
                status: status.as_u16(),
                message: api_error_message(&text)
                    .unwrap_or_else(|| fallback_message(status, &text)),
            });
        }

        if request.expect_binary {
            let bytes = response.bytes().await.map_err(RenderError::from_reqwest)?;
            Ok(RawResponse::Bytes(bytes))
        } else {
            let text = response.text().await.map_err(RenderError::from_reqwest)?;
            Ok(RawResponse::Text(text))
        }
    }
}

/// Cloudflare v4 error envelope (partial)
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: Option<i64>,
    message: String,
}

/// First message of a Cloudflare error envelope
fn api_error_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let first = envelope.errors.into_iter().next()?;
    Some(match first.code {
        Some(code) => format!("{} (code {})", first.message, code),
        None => first.message,
    })
}

/// Status reason plus the start of the body
fn fallback_message(status: reqwest::StatusCode, body: &str) -> String {
    const MAX_BODY: usize = 200;
    let reason = status.canonical_reason().unwrap_or("Unknown status");
    let body = body.trim();
    if body.is_empty() {
        return reason.to_string();
    }
    let snippet: String = body.chars().take(MAX_BODY).collect();
    format!("{}: {}", reason, snippet)
}
