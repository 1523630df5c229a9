//! Example: Render one page through several operations
//!
//! Run with: cargo run -p renderkit --example render_page -- https://example.com
//!
//! Needs `CLOUDFLARE_ACCOUNT_ID` and `CLOUDFLARE_API_TOKEN` in the environment.

use renderkit::{BatchItem, Credentials, OperationKind, OutputRecord, RenderClient};
use serde_json::json;

/// Operations to run, with extra options for each
fn cases(url: &str) -> Vec<(&'static str, BatchItem)> {
    let item = |kind, options: serde_json::Value| {
        let mut bag = options.as_object().cloned().unwrap_or_default();
        bag.insert("url".to_string(), json!(url));
        BatchItem::new(kind, bag)
    };

    vec![
        ("Page links", item(OperationKind::Links, json!({"visibleLinksOnly": true}))),
        ("Markdown", item(OperationKind::Markdown, json!({}))),
        (
            "Headings",
            item(
                OperationKind::Scrape,
                json!({"elements": [{"selector": "h1"}, {"selector": "h2"}]}),
            ),
        ),
        (
            "Full page screenshot",
            item(
                OperationKind::Screenshot,
                json!({"screenshotOptions": {"type": "jpeg", "quality": 80, "fullPage": true}}),
            ),
        ),
        ("Print PDF", item(OperationKind::Pdf, json!({"emulateMediaType": "print"}))),
    ]
}

#[tokio::main]
async fn main() {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let client = match RenderClient::builder()
        .credentials(credentials)
        .continue_on_fail(true)
        .concurrency(2)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("RenderKit Examples for {}", url);
    println!("=====================\n");

    let (descriptions, items): (Vec<_>, Vec<_>) = cases(&url).into_iter().unzip();
    let records = match client.run_batch(items).await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut failed = 0;
    for (i, (description, record)) in descriptions.iter().zip(&records).enumerate() {
        println!("{}. {}", i + 1, description);
        if print_record_summary(record) {
            println!("   ✓ OK\n");
        } else {
            println!("   ✗ FAIL\n");
            failed += 1;
        }
    }

    println!("=====================");
    println!("Results: {} ok, {} failed", records.len() - failed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_record_summary(record: &OutputRecord) -> bool {
    match record {
        OutputRecord::Json(value) => {
            if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
                println!("   Error: {}", error);
                return false;
            }
            let text = value.to_string();
            let preview = text.chars().take(100).collect::<String>();
            println!(
                "   Preview: {}{}",
                preview,
                if text.len() > 100 { "..." } else { "" }
            );
            true
        }
        OutputRecord::Binary { slot, data } => {
            println!("   Slot: {}", slot);
            println!("   File: {} ({})", data.file_name, data.mime_type);
            println!("   Size: {} bytes", data.file_size());
            true
        }
    }
}
