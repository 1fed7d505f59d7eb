//! Link-in-bio page unwrapping.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::{host_of, is_social_host};
use crate::extract::{is_acceptable_email, ASSET_EXTENSIONS};

/// Outbound links followed per aggregator page.
pub const MAX_OUTBOUND_LINKS: usize = 5;

static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).expect("valid regex")
});
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(https?://[^"]+)""#).expect("valid regex"));

/// What an aggregator page points at.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Unwrapped {
    /// Outbound pages worth harvesting, at most [`MAX_OUTBOUND_LINKS`].
    pub links: Vec<String>,
    /// Addresses listed as `mailto:` links.
    pub emails: Vec<String>,
}

/// Reads the outbound links of an aggregator page hosted on `page_host`.
///
/// Structured `__NEXT_DATA__` link lists are preferred; plain anchors are the
/// fallback. Links back to the aggregator itself, to social networks and to
/// static assets are skipped.
#[must_use]
pub fn unwrap_aggregator(html: &str, page_host: &str) -> Unwrapped {
    let raw = next_data_links(html).unwrap_or_else(|| anchor_links(html));

    let mut unwrapped = Unwrapped::default();
    let mut seen = HashSet::new();
    for url in raw {
        if let Some(address) = url.strip_prefix("mailto:") {
            let address = address.split('?').next().unwrap_or_default().trim().to_lowercase();
            if is_acceptable_email(&address) && !unwrapped.emails.contains(&address) {
                unwrapped.emails.push(address);
            }
            continue;
        }
        if unwrapped.links.len() < MAX_OUTBOUND_LINKS
            && is_followable(&url, page_host)
            && seen.insert(url.clone())
        {
            unwrapped.links.push(url);
        }
    }
    unwrapped
}

fn next_data_links(html: &str) -> Option<Vec<String>> {
    let caps = NEXT_DATA_RE.captures(html)?;
    let data: Value = match serde_json::from_str(&caps[1]) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable __NEXT_DATA__ document");
            return None;
        }
    };
    let links = data.pointer("/props/pageProps/account/links")?.as_array()?;
    Some(
        links
            .iter()
            .filter_map(|link| link.get("url")?.as_str())
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .collect(),
    )
}

fn anchor_links(html: &str) -> Vec<String> {
    HREF_RE
        .captures_iter(html)
        .map(|caps| caps[1].to_owned())
        .collect()
}

fn is_followable(url: &str, page_host: &str) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    if host == page_host || is_social_host(&host) {
        return false;
    }
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    !ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
