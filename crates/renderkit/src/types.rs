//! Value types shared by the per-operation option structs

use crate::bag;
use crate::error::RenderError;
use crate::operation::OperationKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Whether the page is fetched from a URL or rendered from literal HTML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelector {
    #[default]
    Url,
    Html,
}

/// Page to render; exactly one of `url` / `html` ends up in the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    Url(String),
    Html(String),
}

impl RenderTarget {
    /// Target a URL
    pub fn url(url: impl Into<String>) -> Self {
        RenderTarget::Url(url.into())
    }

    /// Target literal HTML
    pub fn html(html: impl Into<String>) -> Self {
        RenderTarget::Html(html.into())
    }

    /// Body key for this target
    pub fn key(&self) -> &'static str {
        match self {
            RenderTarget::Url(_) => "url",
            RenderTarget::Html(_) => "html",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RenderTarget::Url(v) | RenderTarget::Html(v) => v,
        }
    }

    pub fn selector(&self) -> SourceSelector {
        match self {
            RenderTarget::Url(_) => SourceSelector::Url,
            RenderTarget::Html(_) => SourceSelector::Html,
        }
    }

    /// Check the target against what `kind` accepts
    pub(crate) fn validate(&self, kind: OperationKind) -> Result<(), RenderError> {
        match self {
            RenderTarget::Html(_) if !kind.accepts_html() => Err(RenderError::validation(
                format!("operation '{}' only accepts a URL source", kind),
            )),
            RenderTarget::Html(html) if html.is_empty() => Err(RenderError::validation(
                "html is required when source is 'html'",
            )),
            RenderTarget::Html(_) => Ok(()),
            RenderTarget::Url(url) => validate_page_url(url),
        }
    }
}

fn validate_page_url(url: &str) -> Result<(), RenderError> {
    if url.is_empty() {
        return Err(RenderError::validation("url is required"));
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(RenderError::validation(format!(
            "url must be an absolute http:// or https:// URL, got '{}'",
            url
        ))),
    }
}

/// Source fields as they appear in the option bag
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub(crate) struct TargetFields {
    /// Render a URL or provided HTML (operations accepting both)
    #[serde(deserialize_with = "bag::non_empty")]
    source: Option<SourceSelector>,
    /// Full URL of the page to process
    #[serde(deserialize_with = "bag::non_empty")]
    url: Option<String>,
    /// HTML content to render
    #[serde(alias = "htmlInput", deserialize_with = "bag::non_empty")]
    html: Option<String>,
}

impl TargetFields {
    /// Resolve the target for `kind`, falling back to HTML only when the
    /// selector is absent and no URL was given
    pub(crate) fn resolve(self, kind: OperationKind) -> Result<RenderTarget, RenderError> {
        let selector = match self.source {
            Some(selector) => selector,
            None if self.url.is_none() && self.html.is_some() => SourceSelector::Html,
            None => SourceSelector::Url,
        };
        if !kind.accepts_html() && selector == SourceSelector::Html {
            return Err(RenderError::validation(format!(
                "operation '{}' only accepts a URL source",
                kind
            )));
        }
        let target = match selector {
            SourceSelector::Url => RenderTarget::Url(
                self.url
                    .ok_or_else(|| RenderError::validation("url is required"))?,
            ),
            SourceSelector::Html => RenderTarget::Html(self.html.ok_or_else(|| {
                RenderError::validation("html is required when source is 'html'")
            })?),
        };
        target.validate(kind)?;
        Ok(target)
    }
}

/// When navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum WaitUntil {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

/// Page navigation options forwarded to the remote browser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GotoOptions {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub wait_until: Option<WaitUntil>,
    /// Navigation timeout in milliseconds, 0 disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

/// Browser viewport size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_scale_factor: Option<f64>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            device_scale_factor: None,
        }
    }
}

/// Screenshot image format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// PNG is lossless and ignores `quality`
    pub fn supports_quality(self) -> bool {
        !matches!(self, ImageFormat::Png)
    }
}

/// Rectangle to clip a screenshot to
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Screenshot parameters for the screenshot and snapshot operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenshotSettings {
    #[serde(
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "bag::non_empty"
    )]
    pub format: Option<ImageFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_page: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit_background: Option<bool>,
    /// 0-100, JPEG and WebP only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::single")]
    pub clip: Option<Clip>,
}

impl ScreenshotSettings {
    /// Format used for the capture, PNG unless set
    pub fn image_format(&self) -> ImageFormat {
        self.format.unwrap_or_default()
    }

    /// Range-check `quality` where it is sent; PNG drops it unchecked
    pub(crate) fn validate(&self) -> Result<(), RenderError> {
        if !self.image_format().supports_quality() {
            return Ok(());
        }
        match self.quality {
            Some(q) if q > 100 => Err(RenderError::validation(format!(
                "screenshot quality must be between 0 and 100, got {}",
                q
            ))),
            _ => Ok(()),
        }
    }

    /// Copy suitable for the request body
    pub(crate) fn for_request(&self) -> Self {
        let mut settings = self.clone();
        if !self.image_format().supports_quality() {
            settings.quality = None;
        }
        settings
    }
}

/// Resource type as classified by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    TextTrack,
    Xhr,
    Fetch,
    Prefetch,
    EventSource,
    WebSocket,
    Manifest,
    SignedExchange,
    Ping,
    CspViolationReport,
    Preflight,
    Other,
}

/// CSS media type to emulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Screen,
    Print,
}

/// Which field of an [`InjectedTag`] carries the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    Content,
    Url,
    Path,
}

/// Style or script tag injected into the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InjectedTag {
    /// Selects the payload field; only that field is sent
    #[serde(skip_serializing, deserialize_with = "bag::non_empty")]
    pub source: Option<TagSource>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "bag::non_empty")]
    pub path: Option<String>,
}

impl InjectedTag {
    /// Inline tag content
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            source: Some(TagSource::Content),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Tag loaded from a URL
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source: Some(TagSource::Url),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Keep only the field named by `source` (or the first one set)
    pub(crate) fn resolve(&self, field: &str) -> Result<Self, RenderError> {
        let source = match self.source {
            Some(source) => source,
            None if self.content.is_some() => TagSource::Content,
            None if self.url.is_some() => TagSource::Url,
            None => TagSource::Path,
        };
        let mut tag = InjectedTag {
            source: Some(source),
            ..Default::default()
        };
        match source {
            TagSource::Content => tag.content = self.content.clone(),
            TagSource::Url => tag.url = self.url.clone(),
            TagSource::Path => tag.path = self.path.clone(),
        }
        if tag.content.is_none() && tag.url.is_none() && tag.path.is_none() {
            return Err(RenderError::validation(format!(
                "{} entry has no {:?} value",
                field, source
            )));
        }
        Ok(tag)
    }
}

/// CSS selector for the scrape operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ElementSelector {
    pub selector: String,
}

impl ElementSelector {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}
