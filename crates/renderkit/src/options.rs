//! Per-operation options
//!
//! Each operation has its own struct holding only the fields the remote
//! endpoint accepts for it, so the field-applicability matrix is encoded in
//! the types. Structs deserialize from the host's option bag (bag key names,
//! wrappers and JSON text accepted) and serialize straight into the request
//! body (API key names, unset fields skipped).

use crate::bag::{self, OptionBag};
use crate::error::RenderError;
use crate::operation::OperationKind;
use crate::types::{
    ElementSelector, GotoOptions, ImageFormat, InjectedTag, MediaType, RenderTarget,
    ResourceType, ScreenshotSettings, TargetFields, Viewport,
};
use crate::DEFAULT_BINARY_PROPERTY;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Page behaviour toggles shared by screenshot, pdf and snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PageControls {
    /// Scroll to the bottom before capturing (lazy-loaded content)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_page: Option<bool>,
    /// Proceed when awaited events fail or time out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_attempt: Option<bool>,
    #[serde(
        rename = "setJavaScriptEnabled",
        skip_serializing_if = "Option::is_none"
    )]
    pub javascript_enabled: Option<bool>,
    /// Extra wait in milliseconds, 0 disables it
    #[serde(skip_serializing_if = "bag::is_disabled_wait")]
    pub wait_for_timeout: Option<u64>,
}

/// Options for `content`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub reject_resource_types: Vec<ResourceType>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub reject_request_pattern: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub user_agent: Option<String>,
}

/// Options for `links`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LinksOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub goto_options: Option<GotoOptions>,
    /// Only links visible in the viewport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_links_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub user_agent: Option<String>,
}

/// Options for `markdown`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkdownOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub reject_request_pattern: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub user_agent: Option<String>,
}

/// Options for `pdf`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub viewport: Option<Viewport>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub reject_resource_types: Vec<ResourceType>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub reject_request_pattern: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub allow_resource_types: Vec<ResourceType>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub allow_request_pattern: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub add_style_tag: Vec<InjectedTag>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub add_script_tag: Vec<InjectedTag>,
    /// Accepts a JSON object or its text
    #[serde(
        rename = "setExtraHTTPHeaders",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "bag::extra_headers"
    )]
    pub extra_http_headers: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub page: PageControls,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub emulate_media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub user_agent: Option<String>,
    /// Output slot for the PDF file, `data` unless set; never sent
    #[serde(skip_serializing, deserialize_with = "bag::non_empty")]
    pub binary_property_name: Option<String>,
}

/// Options for `screenshot`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenshotOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub viewport: Option<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub screenshot_options: Option<ScreenshotSettings>,
    /// Capture only the first element matching this CSS selector
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub allow_resource_types: Vec<ResourceType>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub allow_request_pattern: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub add_style_tag: Vec<InjectedTag>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub add_script_tag: Vec<InjectedTag>,
    #[serde(flatten)]
    pub page: PageControls,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub emulate_media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub user_agent: Option<String>,
    /// Output slot for the image file, `data` unless set; never sent
    #[serde(skip_serializing, deserialize_with = "bag::non_empty")]
    pub binary_property_name: Option<String>,
}

/// Options for `snapshot`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub viewport: Option<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub screenshot_options: Option<ScreenshotSettings>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub add_style_tag: Vec<InjectedTag>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub add_script_tag: Vec<InjectedTag>,
    #[serde(flatten)]
    pub page: PageControls,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub user_agent: Option<String>,
}

/// Options for `scrape`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "bag::list")]
    pub elements: Vec<ElementSelector>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub user_agent: Option<String>,
}

/// Options for `json` (AI extraction)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct JsonExtractOptions {
    /// Guidance for the model on what to extract
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub prompt: Option<String>,
    /// JSON schema of the expected output; accepts the schema or its text
    #[serde(
        rename(serialize = "response_format", deserialize = "responseFormatSchema"),
        alias = "response_format",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "bag::response_format"
    )]
    pub response_format: Option<Value>,
}

impl JsonExtractOptions {
    /// Set the response format from JSON schema text
    pub fn response_format_schema(mut self, schema: &str) -> Result<Self, RenderError> {
        let schema = schema.trim();
        self.response_format = if schema.is_empty() {
            None
        } else {
            Some(serde_json::from_str(schema).map_err(|e| {
                RenderError::validation(format!("responseFormatSchema is not valid JSON: {}", e))
            })?)
        };
        Ok(self)
    }

    /// Set the prompt
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Options for one item, discriminated by operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOptions {
    Content(ContentOptions),
    Links(LinksOptions),
    Markdown(MarkdownOptions),
    Pdf(PdfOptions),
    Screenshot(ScreenshotOptions),
    Snapshot(SnapshotOptions),
    Scrape(ScrapeOptions),
    JsonExtract(JsonExtractOptions),
}

macro_rules! impl_from_options {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for OperationOptions {
                fn from(options: $ty) -> Self {
                    OperationOptions::$variant(options)
                }
            }
        )*
    };
}

impl_from_options! {
    Content => ContentOptions,
    Links => LinksOptions,
    Markdown => MarkdownOptions,
    Pdf => PdfOptions,
    Screenshot => ScreenshotOptions,
    Snapshot => SnapshotOptions,
    Scrape => ScrapeOptions,
    JsonExtract => JsonExtractOptions,
}

fn parse_bag<T: DeserializeOwned>(kind: OperationKind, bag: &OptionBag) -> Result<T, RenderError> {
    serde_json::from_value(Value::Object(bag.clone()))
        .map_err(|e| RenderError::validation(format!("{} options: {}", kind, e)))
}

impl OperationOptions {
    /// Operation these options belong to
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationOptions::Content(_) => OperationKind::Content,
            OperationOptions::Links(_) => OperationKind::Links,
            OperationOptions::Markdown(_) => OperationKind::Markdown,
            OperationOptions::Pdf(_) => OperationKind::Pdf,
            OperationOptions::Screenshot(_) => OperationKind::Screenshot,
            OperationOptions::Snapshot(_) => OperationKind::Snapshot,
            OperationOptions::Scrape(_) => OperationKind::Scrape,
            OperationOptions::JsonExtract(_) => OperationKind::JsonExtract,
        }
    }

    /// Defaults for `kind`
    pub fn empty(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Content => ContentOptions::default().into(),
            OperationKind::Links => LinksOptions::default().into(),
            OperationKind::Markdown => MarkdownOptions::default().into(),
            OperationKind::Pdf => PdfOptions::default().into(),
            OperationKind::Screenshot => ScreenshotOptions::default().into(),
            OperationKind::Snapshot => SnapshotOptions::default().into(),
            OperationKind::Scrape => ScrapeOptions::default().into(),
            OperationKind::JsonExtract => JsonExtractOptions::default().into(),
        }
    }

    /// Read the options of `kind` from a bag, ignoring unrelated keys
    pub fn from_bag(kind: OperationKind, bag: &OptionBag) -> Result<Self, RenderError> {
        Ok(match kind {
            OperationKind::Content => OperationOptions::Content(parse_bag(kind, bag)?),
            OperationKind::Links => OperationOptions::Links(parse_bag(kind, bag)?),
            OperationKind::Markdown => OperationOptions::Markdown(parse_bag(kind, bag)?),
            OperationKind::Pdf => OperationOptions::Pdf(parse_bag(kind, bag)?),
            OperationKind::Screenshot => OperationOptions::Screenshot(parse_bag(kind, bag)?),
            OperationKind::Snapshot => OperationOptions::Snapshot(parse_bag(kind, bag)?),
            OperationKind::Scrape => OperationOptions::Scrape(parse_bag(kind, bag)?),
            OperationKind::JsonExtract => OperationOptions::JsonExtract(parse_bag(kind, bag)?),
        })
    }

    /// Screenshot settings, for operations that take them
    pub fn screenshot_settings(&self) -> Option<&ScreenshotSettings> {
        match self {
            OperationOptions::Screenshot(o) => o.screenshot_options.as_ref(),
            OperationOptions::Snapshot(o) => o.screenshot_options.as_ref(),
            _ => None,
        }
    }

    /// Image format of a screenshot, PNG unless set
    pub fn image_format(&self) -> ImageFormat {
        self.screenshot_settings()
            .map(ScreenshotSettings::image_format)
            .unwrap_or_default()
    }

    /// Output slot name for binary results
    pub fn binary_property_name(&self) -> &str {
        let name = match self {
            OperationOptions::Pdf(o) => o.binary_property_name.as_deref(),
            OperationOptions::Screenshot(o) => o.binary_property_name.as_deref(),
            _ => None,
        };
        name.unwrap_or(DEFAULT_BINARY_PROPERTY)
    }

    /// Check values the type system cannot and produce the body fields
    pub(crate) fn to_body(&self) -> Result<Map<String, Value>, RenderError> {
        let value = match self {
            OperationOptions::Content(o) => serde_json::to_value(o),
            OperationOptions::Links(o) => serde_json::to_value(o),
            OperationOptions::Markdown(o) => serde_json::to_value(o),
            OperationOptions::Pdf(o) => {
                let mut o = o.clone();
                o.add_style_tag = resolve_tags(&o.add_style_tag, "addStyleTag")?;
                o.add_script_tag = resolve_tags(&o.add_script_tag, "addScriptTag")?;
                serde_json::to_value(o)
            }
            OperationOptions::Screenshot(o) => {
                let mut o = o.clone();
                o.screenshot_options = prepare_screenshot(o.screenshot_options.as_ref())?;
                o.add_style_tag = resolve_tags(&o.add_style_tag, "addStyleTag")?;
                o.add_script_tag = resolve_tags(&o.add_script_tag, "addScriptTag")?;
                serde_json::to_value(o)
            }
            OperationOptions::Snapshot(o) => {
                let mut o = o.clone();
                o.screenshot_options = prepare_screenshot(o.screenshot_options.as_ref())?;
                o.add_style_tag = resolve_tags(&o.add_style_tag, "addStyleTag")?;
                o.add_script_tag = resolve_tags(&o.add_script_tag, "addScriptTag")?;
                serde_json::to_value(o)
            }
            OperationOptions::Scrape(o) => {
                if let Some(i) = o.elements.iter().position(|e| e.selector.trim().is_empty()) {
                    return Err(RenderError::validation(format!(
                        "elements[{}] has an empty CSS selector",
                        i
                    )));
                }
                serde_json::to_value(o)
            }
            OperationOptions::JsonExtract(o) => serde_json::to_value(o),
        };
        match value {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(Map::new()),
            Err(e) => Err(RenderError::validation(format!(
                "{} options could not be encoded: {}",
                self.kind(),
                e
            ))),
        }
    }
}

fn resolve_tags(tags: &[InjectedTag], field: &str) -> Result<Vec<InjectedTag>, RenderError> {
    tags.iter().map(|tag| tag.resolve(field)).collect()
}

fn prepare_screenshot(
    settings: Option<&ScreenshotSettings>,
) -> Result<Option<ScreenshotSettings>, RenderError> {
    settings
        .map(|s| {
            s.validate()?;
            Ok(s.for_request())
        })
        .transpose()
}

/// One fully-typed item: the page to render and the operation's options
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub target: RenderTarget,
    pub options: OperationOptions,
}

impl RenderRequest {
    /// Pair a target with options, checking the target is accepted
    pub fn new(
        target: RenderTarget,
        options: impl Into<OperationOptions>,
    ) -> Result<Self, RenderError> {
        let options = options.into();
        target.validate(options.kind())?;
        Ok(Self { target, options })
    }

    /// Request for `kind` with service defaults
    pub fn with_defaults(kind: OperationKind, target: RenderTarget) -> Result<Self, RenderError> {
        Self::new(target, OperationOptions::empty(kind))
    }

    /// Build a request from the host's option bag
    pub fn from_bag(kind: OperationKind, bag: &OptionBag) -> Result<Self, RenderError> {
        let target = parse_bag::<TargetFields>(kind, bag)?.resolve(kind)?;
        let options = OperationOptions::from_bag(kind, bag)?;
        Ok(Self { target, options })
    }

    pub fn kind(&self) -> OperationKind {
        self.options.kind()
    }
}
