//! Request compiler
//!
//! Turns one typed [`RenderRequest`] (or a raw option bag) into the endpoint
//! path, JSON body and encoding expectation for the transport. Pure: no I/O.

use crate::bag::{is_sentinel_empty, OptionBag};
use crate::error::RenderError;
use crate::operation::OperationKind;
use crate::options::RenderRequest;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Compiled request, consumed once by the transport
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub operation: OperationKind,
    /// Path below `/browser-rendering`
    pub path: &'static str,
    pub body: Map<String, Value>,
    /// Response will be a raw byte payload
    pub expect_binary: bool,
}

/// Compile a typed request
pub fn compile(request: &RenderRequest) -> Result<RequestDescriptor, RenderError> {
    let kind = request.kind();
    let spec = kind.spec();

    request.target.validate(kind)?;

    let mut body = Map::new();
    body.insert(
        request.target.key().to_string(),
        Value::String(request.target.value().to_string()),
    );
    body.extend(request.options.to_body()?);
    body.retain(|_, value| !is_sentinel_empty(value));

    debug!(
        operation = %kind,
        path = spec.path,
        source = request.target.key(),
        fields = body.len(),
        "Compiled request"
    );

    Ok(RequestDescriptor {
        operation: kind,
        path: spec.path,
        body,
        expect_binary: spec.binary,
    })
}

/// Compile straight from the host's option bag
pub fn compile_bag(
    operation: OperationKind,
    options: &OptionBag,
) -> Result<RequestDescriptor, RenderError> {
    compile(&RenderRequest::from_bag(operation, options)?)
}
