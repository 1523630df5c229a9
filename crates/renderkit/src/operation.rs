//! Operation table
//!
//! Every remote capability of the Browser Rendering API is described by one
//! static [`OperationSpec`] entry. The compiler and normalizer only ever look
//! operations up here; there is no per-operation branching elsewhere besides
//! the typed option variants.

use crate::options::{
    ContentOptions, JsonExtractOptions, LinksOptions, MarkdownOptions, PdfOptions,
    ScrapeOptions, ScreenshotOptions, SnapshotOptions,
};
use crate::types::TargetFields;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Remote operation selected for an item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Rendered HTML of a page
    Content,
    /// Links found on a page
    Links,
    /// Page converted to Markdown
    Markdown,
    /// PDF document of a page
    Pdf,
    /// Image capture of a page
    Screenshot,
    /// HTML plus base64 screenshot in one JSON response
    Snapshot,
    /// Elements matched by CSS selectors
    Scrape,
    /// Structured data extracted by Workers AI
    #[serde(rename = "json", alias = "jsonExtract")]
    JsonExtract,
}

/// Which page sources an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Either a URL or literal HTML
    UrlOrHtml,
    /// A URL only
    UrlOnly,
}

/// Static metadata for one operation
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub kind: OperationKind,
    /// Selector value and wire name
    pub name: &'static str,
    /// Path below `/browser-rendering`
    pub path: &'static str,
    pub source: SourceMode,
    /// Response is a raw byte payload rather than JSON
    pub binary: bool,
}

/// All supported operations, in selector order
pub const OPERATIONS: [OperationSpec; 8] = [
    OperationSpec {
        kind: OperationKind::Content,
        name: "content",
        path: "/content",
        source: SourceMode::UrlOrHtml,
        binary: false,
    },
    OperationSpec {
        kind: OperationKind::Links,
        name: "links",
        path: "/links",
        source: SourceMode::UrlOnly,
        binary: false,
    },
    OperationSpec {
        kind: OperationKind::Markdown,
        name: "markdown",
        path: "/markdown",
        source: SourceMode::UrlOrHtml,
        binary: false,
    },
    OperationSpec {
        kind: OperationKind::Pdf,
        name: "pdf",
        path: "/pdf",
        source: SourceMode::UrlOrHtml,
        binary: true,
    },
    OperationSpec {
        kind: OperationKind::Screenshot,
        name: "screenshot",
        path: "/screenshot",
        source: SourceMode::UrlOrHtml,
        binary: true,
    },
    OperationSpec {
        kind: OperationKind::Snapshot,
        name: "snapshot",
        path: "/snapshot",
        source: SourceMode::UrlOrHtml,
        binary: false,
    },
    OperationSpec {
        kind: OperationKind::Scrape,
        name: "scrape",
        path: "/scrape",
        source: SourceMode::UrlOnly,
        binary: false,
    },
    OperationSpec {
        kind: OperationKind::JsonExtract,
        name: "json",
        path: "/json",
        source: SourceMode::UrlOnly,
        binary: false,
    },
];

impl OperationKind {
    /// All operations, in selector order
    pub fn all() -> impl Iterator<Item = OperationKind> {
        OPERATIONS.iter().map(|op| op.kind)
    }

    /// Static metadata for this operation
    pub fn spec(self) -> &'static OperationSpec {
        // OPERATIONS is declared in enum order
        &OPERATIONS[self as usize]
    }

    /// Endpoint path below `/browser-rendering`
    pub fn path(self) -> &'static str {
        self.spec().path
    }

    /// True for operations answering with a raw byte payload
    pub fn is_binary(self) -> bool {
        self.spec().binary
    }

    /// True if the operation can render literal HTML
    pub fn accepts_html(self) -> bool {
        self.spec().source == SourceMode::UrlOrHtml
    }

    /// JSON schema of the option bag accepted by this operation
    pub fn options_schema(self) -> serde_json::Value {
        let schema = match self {
            OperationKind::Content => schema_for!(ContentOptions),
            OperationKind::Links => schema_for!(LinksOptions),
            OperationKind::Markdown => schema_for!(MarkdownOptions),
            OperationKind::Pdf => schema_for!(PdfOptions),
            OperationKind::Screenshot => schema_for!(ScreenshotOptions),
            OperationKind::Snapshot => schema_for!(SnapshotOptions),
            OperationKind::Scrape => schema_for!(ScrapeOptions),
            OperationKind::JsonExtract => schema_for!(JsonExtractOptions),
        };
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        // Source fields live outside the option structs
        let source_schema = schema_for!(TargetFields);
        let source = serde_json::to_value(source_schema).unwrap_or_default();
        if let (Some(props), Some(source_props)) = (
            value.get_mut("properties").and_then(|p| p.as_object_mut()),
            source.get("properties").and_then(|p| p.as_object()),
        ) {
            for (name, prop) in source_props {
                if name == "url" || self.accepts_html() {
                    props.insert(name.clone(), prop.clone());
                }
            }
        }
        if let (Some(defs), Some(source_defs)) = (
            value.get_mut("definitions").and_then(|d| d.as_object_mut()),
            source.get("definitions").and_then(|d| d.as_object()),
        ) {
            for (name, def) in source_defs {
                defs.insert(name.clone(), def.clone());
            }
        }
        value
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if lower == "jsonextract" {
            return Ok(OperationKind::JsonExtract);
        }
        OPERATIONS
            .iter()
            .find(|op| op.name == lower)
            .map(|op| op.kind)
            .ok_or_else(|| format!("Unsupported operation: {}", s))
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.spec().name)
    }
}
