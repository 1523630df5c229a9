//! Credentials and endpoint configuration

use crate::error::RenderError;
use url::Url;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Environment variable holding the account ID
pub const ACCOUNT_ID_ENV: &str = "CLOUDFLARE_ACCOUNT_ID";

/// Environment variable holding the API token
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// Account ID and API token with Browser Rendering permission
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub api_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
        }
    }

    /// Read credentials from `CLOUDFLARE_ACCOUNT_ID` / `CLOUDFLARE_API_TOKEN`
    pub fn from_env() -> Result<Self, RenderError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let account_id = read(ACCOUNT_ID_ENV)
            .ok_or(RenderError::MissingCredentials("accountId"))?;
        let api_token = read(API_TOKEN_ENV)
            .ok_or(RenderError::MissingCredentials("apiToken"))?;
        Ok(Self::new(account_id, api_token))
    }

    pub(crate) fn validate(&self) -> Result<(), RenderError> {
        if self.account_id.trim().is_empty() {
            return Err(RenderError::MissingCredentials("accountId"));
        }
        if self.api_token.trim().is_empty() {
            return Err(RenderError::MissingCredentials("apiToken"));
        }
        Ok(())
    }

    /// Value of the `Authorization` header
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.api_token)
    }
}

/// Parse and check an API base URL
pub(crate) fn parse_base_url(base: &str) -> Result<Url, RenderError> {
    let url = Url::parse(base)
        .map_err(|e| RenderError::validation(format!("invalid base URL '{}': {}", base, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(RenderError::validation(format!(
            "base URL must be http:// or https://, got '{}'",
            base
        )));
    }
    Ok(url)
}

/// `{base}/accounts/{account_id}/browser-rendering{path}`
pub(crate) fn endpoint_url(base: &Url, account_id: &str, path: &str) -> Result<Url, RenderError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| RenderError::validation("base URL cannot carry a path"))?;
        segments
            .pop_if_empty()
            .extend(["accounts", account_id, "browser-rendering"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}
