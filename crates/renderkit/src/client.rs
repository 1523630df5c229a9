//! Client for the Browser Rendering API
//!
//! Ties the pieces together per item: option bag to [`RenderRequest`],
//! [`compile`], hand-off to the [`Transport`], then [`normalize`].

use crate::bag::OptionBag;
use crate::compile::{compile, RequestDescriptor};
use crate::config::{endpoint_url, parse_base_url, Credentials, DEFAULT_BASE_URL};
use crate::error::RenderError;
use crate::normalize::{normalize, OutputRecord, RawResponse};
use crate::operation::OperationKind;
use crate::options::RenderRequest;
use crate::transport::{HttpMethod, HttpRequest, ReqwestTransport, Transport, TransportOptions};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Path of the account's Browser Rendering configuration, used to check credentials
const CONFIG_PATH: &str = "/config";

/// One input item: the selected operation and its option bag
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub operation: OperationKind,
    pub options: OptionBag,
}

impl BatchItem {
    pub fn new(operation: OperationKind, options: OptionBag) -> Self {
        Self { operation, options }
    }
}

/// Builder for [`RenderClient`]
#[derive(Default)]
pub struct ClientBuilder {
    credentials: Option<Credentials>,
    base_url: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    continue_on_fail: bool,
    concurrency: Option<usize>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a builder with defaults: sequential, stop on first failure
    pub fn new() -> Self {
        Self::default()
    }

    /// Set account ID and API token
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the API base URL (default `https://api.cloudflare.com/client/v4`)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the User-Agent of the HTTP client
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set a whole-request timeout on the default transport
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Turn item failures into `{"error": ...}` records instead of aborting
    pub fn continue_on_fail(mut self, enable: bool) -> Self {
        self.continue_on_fail = enable;
        self
    }

    /// Number of items in flight during a batch (default 1)
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Use a custom transport instead of reqwest
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<RenderClient, RenderError> {
        let credentials = self
            .credentials
            .ok_or(RenderError::MissingCredentials("accountId"))?;
        credentials.validate()?;

        let base_url = parse_base_url(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&TransportOptions {
                user_agent: self.user_agent,
                timeout: self.timeout,
            })?),
        };

        Ok(RenderClient {
            credentials,
            base_url,
            transport,
            continue_on_fail: self.continue_on_fail,
            concurrency: self.concurrency.unwrap_or(1).max(1),
        })
    }
}

/// Configured Browser Rendering client
#[derive(Clone)]
pub struct RenderClient {
    credentials: Credentials,
    base_url: Url,
    transport: Arc<dyn Transport>,
    continue_on_fail: bool,
    concurrency: usize,
}

impl std::fmt::Debug for RenderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderClient")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url.as_str())
            .field("transport", &self.transport.name())
            .field("continue_on_fail", &self.continue_on_fail)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl RenderClient {
    /// Create a new client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Resolve a compiled descriptor into the request sent to the transport
    pub fn http_request(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest, RenderError> {
        let account_id = &self.credentials.account_id;
        let url = endpoint_url(&self.base_url, account_id, descriptor.path)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            authorization: self.credentials.bearer(),
            body: Some(descriptor.body.clone()),
            expect_binary: descriptor.expect_binary,
        })
    }

    /// Run one typed request
    pub async fn execute(&self, request: &RenderRequest) -> Result<OutputRecord, RenderError> {
        let descriptor = compile(request)?;
        let http_request = self.http_request(&descriptor)?;
        debug!(
            operation = %descriptor.operation,
            transport = self.transport.name(),
            url = %http_request.url,
            "Sending request"
        );
        let raw = self.transport.send(http_request).await?;
        normalize(&request.options, raw)
    }

    /// Run one item given as an operation and option bag
    pub async fn execute_bag(
        &self,
        operation: OperationKind,
        options: &OptionBag,
    ) -> Result<OutputRecord, RenderError> {
        let request = RenderRequest::from_bag(operation, options)?;
        self.execute(&request).await
    }

    /// Run items in order, one output record per item
    ///
    /// With `continue_on_fail` a failed item yields an error record. Otherwise
    /// the first failure in input order is returned and no further item is
    /// started. Up to `concurrency - 1` items after the failed one may already
    /// be in flight and can still reach the API; their results are discarded.
    pub async fn run_batch(&self, items: Vec<BatchItem>) -> Result<Vec<OutputRecord>, RenderError> {
        let total = items.len();
        let mut results = futures::stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                (index, self.execute_bag(item.operation, &item.options).await)
            })
            .buffered(self.concurrency);

        let mut records = Vec::with_capacity(total);
        while let Some((index, result)) = results.next().await {
            match result {
                Ok(record) => records.push(record),
                Err(e) if self.continue_on_fail => {
                    warn!(index, error = %e, "Item failed, continuing");
                    records.push(OutputRecord::error(e.to_string()));
                }
                Err(e) => {
                    warn!(index, error = %e, "Item failed, stopping batch");
                    return Err(e);
                }
            }
        }
        Ok(records)
    }

    /// Check the credentials by reading the account's rendering configuration
    pub async fn verify_credentials(&self) -> Result<Value, RenderError> {
        let url = endpoint_url(&self.base_url, &self.credentials.account_id, CONFIG_PATH)?;
        let raw = self
            .transport
            .send(HttpRequest {
                method: HttpMethod::Get,
                url: url.to_string(),
                authorization: self.credentials.bearer(),
                body: None,
                expect_binary: false,
            })
            .await?;
        match raw {
            RawResponse::Json(value) => Ok(value),
            RawResponse::Text(text) => serde_json::from_str(&text).map_err(RenderError::Parse),
            RawResponse::Bytes(bytes) => serde_json::from_slice(&bytes).map_err(RenderError::Parse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records requests and answers with the body it was sent
    #[derive(Default)]
    struct EchoTransport {
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn send(&self, request: HttpRequest) -> Result<RawResponse, RenderError> {
            self.seen.lock().unwrap().push(request.clone());
            if request.expect_binary {
                return Ok(RawResponse::Bytes(Bytes::from_static(b"binary")));
            }
            let body = request.body.unwrap_or_default();
            Ok(RawResponse::Json(Value::Object(body)))
        }
    }

    fn client(transport: Arc<EchoTransport>) -> RenderClient {
        RenderClient::builder()
            .credentials(Credentials::new("acc", "tok"))
            .transport(transport)
            .build()
            .unwrap()
    }

    fn bag(value: Value) -> OptionBag {
        match value {
            Value::Object(map) => map,
            _ => panic!("bag must be an object"),
        }
    }

    fn item(kind: OperationKind, url: &str) -> BatchItem {
        BatchItem::new(kind, bag(json!({ "url": url })))
    }

    /// Page URLs carried in the bodies the transport received
    fn sent_pages(transport: &EchoTransport) -> Vec<String> {
        let seen = transport.seen.lock().unwrap();
        seen.iter()
            .filter_map(|request| request.body.as_ref()?.get("url")?.as_str())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_build_requires_credentials() {
        let result = RenderClient::builder().build();
        assert!(matches!(result, Err(RenderError::MissingCredentials(_))));
    }

    #[test]
    fn test_build_rejects_bad_base_url() {
        let result = RenderClient::builder()
            .credentials(Credentials::new("acc", "tok"))
            .base_url("ftp://example.com")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_http_request() {
        let client = client(Arc::new(EchoTransport::default()));
        let request = RenderRequest::from_bag(
            OperationKind::Pdf,
            &bag(json!({"url": "https://example.com"})),
        )
        .unwrap();
        let http = client.http_request(&compile(&request).unwrap()).unwrap();
        assert_eq!(http.method, HttpMethod::Post);
        assert_eq!(
            http.url,
            "https://api.cloudflare.com/client/v4/accounts/acc/browser-rendering/pdf"
        );
        assert_eq!(http.authorization, "Bearer tok");
        assert!(http.expect_binary);
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let transport = Arc::new(EchoTransport::default());
        let client = client(transport.clone());

        for kind in OperationKind::all().filter(|k| !k.is_binary()) {
            let request = RenderRequest::from_bag(
                kind,
                &bag(json!({
                    "url": "https://example.com",
                    "userAgent": "Echo/1.0",
                    "visibleLinksOnly": true,
                    "prompt": "titles",
                })),
            )
            .unwrap();
            let compiled = compile(&request).unwrap();
            let record = client.execute(&request).await.unwrap();
            assert_eq!(record, OutputRecord::Json(Value::Object(compiled.body)));
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let transport = Arc::new(EchoTransport::default());
        let client = RenderClient::builder()
            .credentials(Credentials::new("acc", "tok"))
            .transport(transport.clone())
            .concurrency(4)
            .build()
            .unwrap();

        let items: Vec<BatchItem> = (0..10)
            .map(|i| {
                BatchItem::new(
                    OperationKind::Links,
                    bag(json!({"url": format!("https://example.com/{}", i)})),
                )
            })
            .collect();
        let records = client.run_batch(items).await.unwrap();
        assert_eq!(records.len(), 10);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(
                record.as_json().unwrap()["url"],
                format!("https://example.com/{}", i)
            );
        }
    }

    #[tokio::test]
    async fn test_batch_stops_on_failure() {
        let transport = Arc::new(EchoTransport::default());
        let client = client(transport.clone());

        let items = vec![
            item(OperationKind::Content, "https://a.example"),
            BatchItem::new(OperationKind::Content, bag(json!({}))),
            item(OperationKind::Content, "https://c.example"),
        ];
        let err = client.run_batch(items).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_batch_starts_nothing_past_window() {
        let transport = Arc::new(EchoTransport::default());
        let client = RenderClient::builder()
            .credentials(Credentials::new("acc", "tok"))
            .transport(transport.clone())
            .concurrency(3)
            .build()
            .unwrap();

        let mut items = vec![BatchItem::new(OperationKind::Links, bag(json!({})))];
        for i in 1..6 {
            let url = format!("https://example.com/{}", i);
            items.push(item(OperationKind::Links, &url));
        }
        let err = client.run_batch(items).await.unwrap_err();
        assert!(err.is_validation());

        // only items sharing the window with the failure may have been sent
        let window = ["https://example.com/1", "https://example.com/2"];
        let sent = sent_pages(&transport);
        assert!(sent.len() <= 2);
        for page in &sent {
            assert!(window.contains(&page.as_str()), "unexpected send: {page}");
        }
    }

    #[tokio::test]
    async fn test_batch_continue_on_fail() {
        let transport = Arc::new(EchoTransport::default());
        let client = RenderClient::builder()
            .credentials(Credentials::new("acc", "tok"))
            .transport(transport.clone())
            .continue_on_fail(true)
            .build()
            .unwrap();

        let items = vec![
            BatchItem::new(
                OperationKind::JsonExtract,
                bag(json!({"url": "https://a.example", "responseFormatSchema": "{bad json"})),
            ),
            item(OperationKind::Screenshot, "https://b.example"),
        ];
        let records = client.run_batch(items).await.unwrap();
        assert_eq!(records.len(), 2);
        let error = records[0].as_json().unwrap()["error"].as_str().unwrap();
        assert!(error.contains("responseFormatSchema"));
        let (slot, data) = records[1].as_binary().unwrap();
        assert_eq!(slot, "data");
        assert_eq!(data.file_name, "screenshot.png");
        // the failed item never reached the transport
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_verify_credentials_uses_get() {
        let transport = Arc::new(EchoTransport::default());
        let client = client(transport.clone());
        let value = tokio_test::block_on(client.verify_credentials()).unwrap();
        assert_eq!(value, json!({}));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Get);
        let url = &seen[0].url;
        assert!(url.ends_with("/accounts/acc/browser-rendering/config"));
        assert!(seen[0].body.is_none());
    }
}
