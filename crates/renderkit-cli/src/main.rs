//! RenderKit CLI - Command-line interface for the Browser Rendering API

use clap::{Args, Parser, Subcommand};
use renderkit::{
    compile_bag, Credentials, OperationKind, OptionBag, OutputRecord, RenderClient, ACCOUNT_ID_ENV,
    API_TOKEN_ENV,
};
use serde_json::Value;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// RenderKit - render pages through Cloudflare Browser Rendering
#[derive(Parser, Debug)]
#[command(name = "renderkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one operation and print the result
    Run {
        /// Operation: content, json, links, markdown, pdf, scrape, screenshot, snapshot
        operation: OperationKind,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        auth: AuthArgs,

        /// Where to write a binary result (default: file name chosen by the operation)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// User-Agent of the HTTP client
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Print the request that would be sent, without sending it
    Compile {
        /// Operation to compile
        operation: OperationKind,

        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the JSON schema of an operation's options
    Schema {
        /// Operation to describe
        operation: OperationKind,
    },
    /// Check that the credentials are accepted
    Verify {
        #[command(flatten)]
        auth: AuthArgs,
    },
}

/// Page source and options
#[derive(Args, Debug, Default)]
struct InputArgs {
    /// Options as a JSON object
    #[arg(long, conflicts_with = "options_file")]
    options: Option<String>,

    /// File holding the options JSON object
    #[arg(long)]
    options_file: Option<PathBuf>,

    /// Page URL (overrides the options)
    #[arg(long, conflicts_with = "html")]
    url: Option<String>,

    /// Literal HTML to render (overrides the options)
    #[arg(long)]
    html: Option<String>,
}

/// Account settings; falls back to CLOUDFLARE_ACCOUNT_ID / CLOUDFLARE_API_TOKEN
#[derive(Args, Debug, Default)]
struct AuthArgs {
    /// Cloudflare account ID
    #[arg(long)]
    account_id: Option<String>,

    /// API token with Browser Rendering permission
    #[arg(long)]
    api_token: Option<String>,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run {
            operation,
            input,
            auth,
            output,
            timeout,
            user_agent,
        }) => {
            run_operation(operation, &input, &auth, output, timeout, user_agent)
                .await
        }
        Some(Commands::Compile { operation, input }) => run_compile(operation, &input),
        Some(Commands::Schema { operation }) => {
            print_json(&operation.options_schema());
            Ok(())
        }
        Some(Commands::Verify { auth }) => run_verify(&auth).await,
        None => {
            eprintln!("Usage: renderkit run <OPERATION> --url <URL>");
            eprintln!("   or: renderkit compile <OPERATION> --options <JSON>");
            eprintln!("   or: renderkit schema <OPERATION>");
            eprintln!("   or: renderkit --help");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by RUST_LOG
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "renderkit=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run_operation(
    operation: OperationKind,
    input: &InputArgs,
    auth: &AuthArgs,
    output: Option<PathBuf>,
    timeout: Option<u64>,
    user_agent: Option<String>,
) -> Result<(), String> {
    let bag = load_bag(input)?;
    debug!(operation = %operation, options = bag.len(), "Running operation");

    let mut builder = RenderClient::builder().credentials(credentials(auth)?);
    if let Some(base_url) = &auth.base_url {
        builder = builder.base_url(base_url);
    }
    if let Some(secs) = timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let client = builder.build().map_err(|e| e.to_string())?;

    let record = client
        .execute_bag(operation, &bag)
        .await
        .map_err(|e| e.to_string())?;

    if let OutputRecord::Binary { data, .. } = &record {
        let path = output.unwrap_or_else(|| PathBuf::from(&data.file_name));
        write_file(&path, &data.data)?;
        eprintln!("Wrote {} bytes to {}", data.file_size(), path.display());
    }
    writeln_safe(&format_record(&record));
    Ok(())
}

fn run_compile(operation: OperationKind, input: &InputArgs) -> Result<(), String> {
    let bag = load_bag(input)?;
    let descriptor = compile_bag(operation, &bag).map_err(|e| e.to_string())?;
    print_json(&descriptor);
    Ok(())
}

async fn run_verify(auth: &AuthArgs) -> Result<(), String> {
    let mut builder = RenderClient::builder().credentials(credentials(auth)?);
    if let Some(base_url) = &auth.base_url {
        builder = builder.base_url(base_url);
    }
    let client = builder.build().map_err(|e| e.to_string())?;
    let value = client
        .verify_credentials()
        .await
        .map_err(|e| e.to_string())?;
    print_json(&value);
    Ok(())
}

/// Flags win over the environment
fn credentials(auth: &AuthArgs) -> Result<Credentials, String> {
    let resolve = |flag: &Option<String>, var: &str| {
        flag.clone()
            .or_else(|| std::env::var(var).ok())
            .filter(|v| !v.trim().is_empty())
    };
    let account_id = resolve(&auth.account_id, ACCOUNT_ID_ENV)
        .ok_or_else(|| missing("account ID", "--account-id", ACCOUNT_ID_ENV))?;
    let api_token = resolve(&auth.api_token, API_TOKEN_ENV)
        .ok_or_else(|| missing("API token", "--api-token", API_TOKEN_ENV))?;
    Ok(Credentials::new(account_id, api_token))
}

fn missing(what: &str, flag: &str, var: &str) -> String {
    format!("Missing {}: pass {} or set {}", what, flag, var)
}

/// Build the option bag from --options / --options-file plus --url / --html
fn load_bag(input: &InputArgs) -> Result<OptionBag, String> {
    let text = match (&input.options, &input.options_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?,
        ),
        (None, None) => None,
    };
    let mut bag = match text {
        Some(text) => parse_bag(&text)?,
        None => OptionBag::new(),
    };

    if let Some(url) = &input.url {
        bag.insert("source".to_string(), Value::from("url"));
        bag.insert("url".to_string(), Value::from(url.as_str()));
    }
    if let Some(html) = &input.html {
        bag.insert("source".to_string(), Value::from("html"));
        bag.insert("html".to_string(), Value::from(html.as_str()));
    }
    Ok(bag)
}

fn parse_bag(text: &str) -> Result<OptionBag, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Options must be a JSON object".to_string()),
        Err(e) => Err(format!("Options are not valid JSON: {}", e)),
    }
}

/// JSON results print as-is; binary results print their metadata
fn format_record(record: &OutputRecord) -> String {
    let value = match record {
        OutputRecord::Json(value) => value.clone(),
        OutputRecord::Binary { .. } => serde_json::to_value(record).unwrap_or_default(),
    };
    serde_json::to_string_pretty(&value)
        .unwrap_or_else(|_| value.to_string())
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), String> {
    std::fs::write(path, data)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        std::process::exit(1);
    });
    writeln_safe(&json);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderkit::{normalize, OperationOptions, RawResponse};
    use serde_json::json;

    fn binary_record() -> OutputRecord {
        normalize(
            &OperationOptions::empty(OperationKind::Screenshot),
            RawResponse::Bytes(vec![0x89, b'P', b'N', b'G'].into()),
        )
        .unwrap()
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "renderkit",
            "run",
            "screenshot",
            "--url",
            "https://example.com",
            "--options",
            r#"{"screenshotOptions":{"type":"jpeg"}}"#,
            "-o",
            "shot.jpeg",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                operation,
                input,
                output,
                ..
            }) => {
                assert_eq!(operation, OperationKind::Screenshot);
                assert_eq!(input.url.as_deref(), Some("https://example.com"));
                assert_eq!(output, Some(PathBuf::from("shot.jpeg")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_accepts_json_extract_alias() {
        let args = ["renderkit", "schema", "jsonExtract"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Schema {
                operation: OperationKind::JsonExtract
            })
        ));
        let result = Cli::try_parse_from(["renderkit", "schema", "crawl"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_url_and_html() {
        let result = Cli::try_parse_from([
            "renderkit",
            "compile",
            "content",
            "--url",
            "https://example.com",
            "--html",
            "<p/>",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_bag_flags_override_options() {
        let options = r#"{"source":"html","html":"<p/>","userAgent":"X"}"#;
        let input = InputArgs {
            options: Some(options.to_string()),
            url: Some("https://example.com".to_string()),
            ..Default::default()
        };
        let bag = load_bag(&input).unwrap();
        assert_eq!(bag["source"], "url");
        assert_eq!(bag["url"], "https://example.com");
        assert_eq!(bag["userAgent"], "X");

        let desc = compile_bag(OperationKind::Content, &bag).unwrap();
        assert!(!desc.body.contains_key("html"));
    }

    #[test]
    fn test_load_bag_rejects_non_objects() {
        let input = InputArgs {
            options: Some("[1, 2]".to_string()),
            ..Default::default()
        };
        assert!(load_bag(&input).unwrap_err().contains("JSON object"));

        let input = InputArgs {
            options: Some("{nope".to_string()),
            ..Default::default()
        };
        assert!(load_bag(&input).unwrap_err().contains("not valid JSON"));
    }

    #[test]
    fn test_load_bag_empty() {
        assert!(load_bag(&InputArgs::default()).unwrap().is_empty());
    }

    #[test]
    fn test_credentials_from_flags() {
        let auth = AuthArgs {
            account_id: Some("acc".to_string()),
            api_token: Some("tok".to_string()),
            base_url: None,
        };
        assert_eq!(credentials(&auth).unwrap(), Credentials::new("acc", "tok"));
    }

    #[test]
    fn test_format_record_json() {
        let record = OutputRecord::Json(json!({"success": true}));
        let output = format_record(&record);
        assert!(output.contains("\"success\": true"));
        assert!(!output.contains("\"json\""));
    }

    #[test]
    fn test_format_record_binary() {
        let output = format_record(&binary_record());
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value,
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
}
