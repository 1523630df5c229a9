//! RenderKit - client core for the Cloudflare Browser Rendering API
//!
//! Each input item selects one of eight rendering operations and carries a
//! loosely-typed option bag. RenderKit turns that into a typed request,
//! compiles it into an endpoint path and JSON body, and normalizes the
//! response into a uniform [`OutputRecord`].
//!
//! ## Operations
//!
//! | Operation | Endpoint | Source | Response |
//! |-----------|----------|--------|----------|
//! | content | `/content` | url or html | JSON |
//! | json | `/json` | url | JSON |
//! | links | `/links` | url | JSON |
//! | markdown | `/markdown` | url or html | JSON |
//! | pdf | `/pdf` | url or html | binary |
//! | scrape | `/scrape` | url | JSON |
//! | screenshot | `/screenshot` | url or html | binary |
//! | snapshot | `/snapshot` | url or html | JSON |
//!
//! HTTP goes through the [`Transport`] trait; [`ReqwestTransport`] is the
//! default.

pub(crate) mod bag;
pub mod client;
mod compile;
mod config;
mod error;
mod normalize;
mod operation;
pub mod options;
pub mod transport;
pub mod types;

pub use bag::OptionBag;
pub use client::{BatchItem, ClientBuilder, RenderClient};
pub use compile::{compile, compile_bag, RequestDescriptor};
pub use config::{Credentials, ACCOUNT_ID_ENV, API_TOKEN_ENV, DEFAULT_BASE_URL};
pub use error::RenderError;
pub use normalize::{normalize, BinaryData, OutputRecord, RawResponse};
pub use operation::{OperationKind, OperationSpec, SourceMode, OPERATIONS};
pub use options::{OperationOptions, RenderRequest};
pub use transport::{HttpMethod, HttpRequest, ReqwestTransport, Transport, TransportOptions};
pub use types::{RenderTarget, SourceSelector};

/// Default User-Agent of the HTTP client
pub const DEFAULT_USER_AGENT: &str = "RenderKit/1.0";

/// Slot that binary payloads are stored under unless overridden
pub const DEFAULT_BINARY_PROPERTY: &str = "data";
