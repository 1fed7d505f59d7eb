//! Host extraction for rate-limit keys and log fields.

use crate::error::GatewayError;

/// Parses an absolute http(s) URL.
pub(crate) fn parse_http_url(url: &str) -> Result<reqwest::Url, GatewayError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| GatewayError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(GatewayError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

/// Lowercased hostname of `url`, falling back to the raw string if it has none.
pub(crate) fn host_key(url: &reqwest::Url) -> String {
    url.host_str()
        .map_or_else(|| url.as_str().to_owned(), str::to_ascii_lowercase)
}
