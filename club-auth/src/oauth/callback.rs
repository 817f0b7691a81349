//! Query parameters delivered to the OAuth redirect URI.

use url::Url;

use crate::error::Error;

/// Parameters read from the callback URL; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string (with or without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = CallbackParams::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                _ => continue,
            };
            // First occurrence wins, empty values count as absent.
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Parse the full URL the provider redirected the browser to.
    pub fn from_url(callback_url: &str) -> Result<Self, Error> {
        let url = Url::parse(callback_url.trim())?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }
}
