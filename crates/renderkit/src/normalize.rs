//! Response normalizer
//!
//! Converts whatever the transport returned into one [`OutputRecord`]:
//! JSON operations yield their (re-parsed if textual) body verbatim, binary
//! operations yield a named file with MIME type under the configured slot.

use crate::error::RenderError;
use crate::operation::OperationKind;
use crate::options::OperationOptions;
use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Response payload as handed back by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Already-parsed JSON
    Json(Value),
    /// Textual body, expected to hold JSON
    Text(String),
    /// Raw byte payload
    Bytes(Bytes),
}

impl RawResponse {
    /// Shape of the payload, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            RawResponse::Json(Value::Object(_)) => "object",
            RawResponse::Json(Value::Array(_)) => "array",
            RawResponse::Json(Value::String(_)) | RawResponse::Text(_) => "string",
            RawResponse::Json(Value::Number(_)) => "number",
            RawResponse::Json(Value::Bool(_)) => "boolean",
            RawResponse::Json(Value::Null) => "null",
            RawResponse::Bytes(_) => "bytes",
        }
    }

    /// JSON list of top-level keys, or `N/A`
    fn keys(&self) -> String {
        match self {
            RawResponse::Json(Value::Object(map)) => {
                let keys: Vec<&String> = map.keys().collect();
                serde_json::to_string(&keys)
                    .unwrap_or_else(|_| "N/A".to_string())
            }
            _ => "\"N/A\"".to_string(),
        }
    }
}

/// File produced by a binary operation
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryData {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl BinaryData {
    pub fn file_extension(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn file_size(&self) -> usize {
        self.data.len()
    }
}

/// Output for one input item
#[derive(Debug, Clone, PartialEq)]
pub enum OutputRecord {
    /// Structured response body
    Json(Value),
    /// File stored under a named slot
    Binary { slot: String, data: BinaryData },
}

impl OutputRecord {
    /// Record standing in for a failed item
    pub fn error(message: impl Into<String>) -> Self {
        OutputRecord::Json(json!({ "error": message.into() }))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            OutputRecord::Json(value) => Some(value),
            OutputRecord::Binary { .. } => None,
        }
    }

    pub fn as_binary(&self) -> Option<(&str, &BinaryData)> {
        match self {
            OutputRecord::Binary { slot, data } => Some((slot, data)),
            OutputRecord::Json(_) => None,
        }
    }
}

/// Serializes as `{"json": ...}` or `{"json": {}, "binary": {slot: meta}}`;
/// file bytes are left out
impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OutputRecord::Json(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("json", value)?;
                map.end()
            }
            OutputRecord::Binary { slot, data } => {
                let mut meta = Map::new();
                meta.insert(
                    slot.clone(),
                    json!({
                        "fileName": data.file_name,
                        "mimeType": data.mime_type,
                        "fileExtension": data.file_extension(),
                        "fileSize": data.file_size(),
                    }),
                );
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("json", &json!({}))?;
                map.serialize_entry("binary", &meta)?;
                map.end()
            }
        }
    }
}

/// File name and MIME type for a binary operation
fn binary_naming(options: &OperationOptions) -> (String, String) {
    match options.kind() {
        OperationKind::Pdf => ("output.pdf".to_string(), "application/pdf".to_string()),
        OperationKind::Screenshot => {
            let format = options.image_format();
            (
                format!("screenshot.{}", format.extension()),
                format.mime_type().to_string(),
            )
        }
        _ => ("output".to_string(), "application/octet-stream".to_string()),
    }
}

fn wrap_binary(options: &OperationOptions, raw: RawResponse) -> Result<OutputRecord, RenderError> {
    let failure = |message: &str, raw: &RawResponse| RenderError::BinaryProcessing {
        message: message.to_string(),
        payload_type: raw.type_name().to_string(),
        payload_keys: raw.keys(),
    };

    let data = match raw {
        RawResponse::Bytes(bytes) => bytes,
        other => return Err(failure("payload is not raw bytes", &other)),
    };
    if data.is_empty() {
        return Err(failure(
            "received an empty payload",
            &RawResponse::Bytes(data),
        ));
    }

    let (file_name, mime_type) = binary_naming(options);
    let slot = options.binary_property_name().to_string();
    debug!(
        operation = %options.kind(),
        slot = %slot,
        file_name = %file_name,
        size = data.len(),
        "Wrapped binary response"
    );

    Ok(OutputRecord::Binary {
        slot,
        data: BinaryData {
            file_name,
            mime_type,
            data,
        },
    })
}

/// Normalize a raw response for the operation described by `options`
pub fn normalize(
    options: &OperationOptions,
    raw: RawResponse,
) -> Result<OutputRecord, RenderError> {
    if options.kind().is_binary() {
        return wrap_binary(options, raw);
    }

    let value = match raw {
        RawResponse::Json(value) => value,
        RawResponse::Text(text) => serde_json::from_str(&text).map_err(RenderError::Parse)?,
        RawResponse::Bytes(bytes) => serde_json::from_slice(&bytes).map_err(RenderError::Parse)?,
    };
    Ok(OutputRecord::Json(value))
}
