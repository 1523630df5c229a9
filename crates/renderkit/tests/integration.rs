//! Integration tests for RenderKit using wiremock

use renderkit::{
    BatchItem, Credentials, OperationKind, OptionBag, OutputRecord, RenderClient, RenderError,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bag(value: Value) -> OptionBag {
    match value {
        Value::Object(map) => map,
        _ => panic!("bag must be an object"),
    }
}

fn item(kind: OperationKind, url: &str) -> BatchItem {
    BatchItem::new(kind, bag(json!({ "url": url })))
}

fn client(server: &MockServer) -> RenderClient {
    client_with(server, false)
}

fn client_with(server: &MockServer, continue_on_fail: bool) -> RenderClient {
    RenderClient::builder()
        .credentials(Credentials::new("acc", "test-token"))
        .base_url(format!("{}/client/v4", server.uri()))
        .continue_on_fail(continue_on_fail)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_content_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/content"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({"url": "https://example.com"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "result": "<html></html>"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let record = client(&mock_server)
        .execute_bag(
            OperationKind::Content,
            &bag(json!({"source": "url", "url": "https://example.com", "userAgent": ""})),
        )
        .await
        .unwrap();

    assert_eq!(
        record,
        OutputRecord::Json(json!({"success": true, "result": "<html></html>"}))
    );
}

#[tokio::test]
async fn test_json_extract_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/json"))
        .and(body_json(json!({
            "url": "https://example.com/widget",
            "prompt": "Extract the product name",
            "response_format": {"type": "object", "properties": {"name": {"type": "string"}}},
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "result": {"name": "Widget"}})),
        )
        .mount(&mock_server)
        .await;

    let record = client(&mock_server)
        .execute_bag(
            OperationKind::JsonExtract,
            &bag(json!({
                "source": "url",
                "url": "https://example.com/widget",
                "prompt": "Extract the product name",
                "responseFormatSchema":
                    r#"{"type":"object","properties":{"name":{"type":"string"}}}"#,
            })),
        )
        .await
        .unwrap();

    assert_eq!(record.as_json().unwrap()["result"]["name"], "Widget");
}

#[tokio::test]
async fn test_json_extract_rejects_html_source() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .execute_bag(
            OperationKind::JsonExtract,
            &bag(json!({"source": "html", "html": "<h1>Widget</h1>", "prompt": "Name?"})),
        )
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("only accepts a URL source"));
}

#[tokio::test]
async fn test_screenshot_binary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/screenshot"))
        .and(header("accept", "*/*"))
        .and(body_json(json!({
            "url": "https://example.com",
            "screenshotOptions": {"type": "jpeg", "quality": 70, "fullPage": true},
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg"),
        )
        .mount(&mock_server)
        .await;

    let record = client(&mock_server)
        .execute_bag(
            OperationKind::Screenshot,
            &bag(json!({
                "url": "https://example.com",
                "screenshotOptions": {"type": "jpeg", "quality": 70, "fullPage": true},
                "binaryPropertyName": "shot",
            })),
        )
        .await
        .unwrap();

    let (slot, data) = record.as_binary().unwrap();
    assert_eq!(slot, "shot");
    assert_eq!(data.file_name, "screenshot.jpeg");
    assert_eq!(data.mime_type, "image/jpeg");
    assert_eq!(data.data.as_ref(), &[0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn test_pdf_binary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.7 ...".to_vec(), "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let record = client(&mock_server)
        .execute_bag(
            OperationKind::Pdf,
            &bag(json!({"url": "https://example.com", "emulateMediaType": "print"})),
        )
        .await
        .unwrap();

    let (slot, data) = record.as_binary().unwrap();
    assert_eq!(slot, "data");
    assert_eq!(data.file_name, "output.pdf");
    assert_eq!(data.mime_type, "application/pdf");
    assert!(data.data.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_empty_binary_payload_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/pdf"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .execute_bag(
            OperationKind::Pdf,
            &bag(json!({"url": "https://example.com"})),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::BinaryProcessing { .. }));
}

#[tokio::test]
async fn test_api_error_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/links"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "errors": [{"code": 10000, "message": "Authentication error"}],
            "messages": [],
            "result": null,
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .execute_bag(
            OperationKind::Links,
            &bag(json!({"url": "https://example.com"})),
        )
        .await
        .unwrap_err();

    match err {
        RenderError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Authentication error (code 10000)");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_response_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/markdown"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .execute_bag(
            OperationKind::Markdown,
            &bag(json!({"url": "https://example.com"})),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Parse(_)));
}

#[tokio::test]
async fn test_validation_error_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .execute_bag(
            OperationKind::Scrape,
            &bag(json!({"source": "html", "html": "<p>x</p>"})),
        )
        .await
        .unwrap_err();

    assert!(err.is_validation());
}

#[tokio::test]
async fn test_batch_continue_on_fail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/links"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "result": ["https://example.com/a"]})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/scrape"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let items = vec![
        item(OperationKind::Links, "https://example.com"),
        BatchItem::new(
            OperationKind::Scrape,
            bag(json!({"url": "https://example.com", "elements": [{"selector": "h1"}]})),
        ),
        item(OperationKind::Links, "https://example.com"),
    ];

    let records = client_with(&mock_server, true)
        .run_batch(items)
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].as_json().unwrap()["success"], true);
    let error = records[1].as_json().unwrap()["error"].as_str().unwrap();
    assert!(error.contains("500"));
    assert!(error.contains("boom"));
    assert_eq!(records[2], records[0]);
}

#[tokio::test]
async fn test_batch_stops_on_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/snapshot"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "errors": [{"code": 2001, "message": "Rate limit exceeded"}],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let items = vec![
        item(OperationKind::Snapshot, "https://a.example"),
        item(OperationKind::Snapshot, "https://b.example"),
    ];

    let err = client(&mock_server).run_batch(items).await.unwrap_err();
    assert!(err.to_string().contains("Rate limit exceeded"));
}

#[tokio::test]
async fn test_verify_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/client/v4/accounts/acc/browser-rendering/config"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "result": {}})),
        )
        .mount(&mock_server)
        .await;

    let value = client(&mock_server).verify_credentials().await.unwrap();
    assert_eq!(value["success"], true);
}

#[tokio::test]
async fn test_output_record_json_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/accounts/acc/browser-rendering/screenshot"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"\x89PNG".to_vec(), "image/png"),
        )
        .mount(&mock_server)
        .await;

    let record = client(&mock_server)
        .execute_bag(
            OperationKind::Screenshot,
            &bag(json!({"url": "https://example.com"})),
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "json": {},
            "binary": {"data": {
                "fileName": "screenshot.png",
                "mimeType": "image/png",
                "fileExtension": "png",
                "fileSize": 4,
            }}
        })
    );
}
