//! Site contact harvesting.
//!
//! Pages are fetched through the [`Gateway`] one at a time. A failed or
//! non-2xx fetch is logged at `debug` and skipped; harvesting never fails.

mod aggregator;

pub use aggregator::{unwrap_aggregator, Unwrapped, MAX_OUTBOUND_LINKS};

use scout_core::{ContactSignal, SignalSource};
use scout_gateway::Gateway;

use crate::domain::{host_of, is_aggregator_host, is_social_host, parse_loose, site_root};
use crate::extract::{extract_emails, extract_phones};
use crate::signals::SignalSet;

/// Paths tried after the homepage, in order.
const CONTACT_PATHS: &[&str] = &["/contact", "/about"];

/// Homepage plus contact pages to harvest for a lead.
///
/// The lead's own website is used when it is a real site; social and
/// link-in-bio hosts are skipped in favour of the resolved domain.
#[must_use]
pub fn site_pages(website: Option<&str>, domain: Option<&str>) -> Vec<String> {
    let own_site = website.and_then(|site| {
        let host = host_of(site)?;
        if is_social_host(&host) || is_aggregator_host(&host) {
            return None;
        }
        Some((parse_loose(site)?.to_string(), site_root(site)?))
    });
    let (homepage, root) = match (own_site, domain) {
        (Some(site), _) => site,
        (None, Some(domain)) => {
            let root = format!("https://{domain}");
            (root.clone(), root)
        }
        (None, None) => return Vec::new(),
    };

    let mut pages = vec![homepage];
    for path in CONTACT_PATHS {
        let page = format!("{root}{path}");
        if !pages.contains(&page) {
            pages.push(page);
        }
    }
    pages
}

/// Harvests `pages` in order, stopping after the first page that yields an
/// email unless `exhaustive` is set. Returns the number of emails added.
pub async fn harvest_site<G>(
    gateway: &G,
    signals: &mut SignalSet,
    pages: &[String],
    exhaustive: bool,
) -> usize
where
    G: Gateway + ?Sized,
{
    let mut emails_added = 0;
    for page in pages {
        let Some(body) = fetch_page(gateway, page).await else {
            continue;
        };
        emails_added += absorb_page(signals, &body, page);
        if emails_added > 0 && !exhaustive {
            tracing::debug!(page = %page, "email found, skipping remaining pages");
            break;
        }
    }
    emails_added
}

/// Harvests a bio link. Aggregator pages are unwrapped and their outbound
/// links harvested one level deep; social network pages are not fetched.
pub async fn harvest_link<G>(gateway: &G, signals: &mut SignalSet, url: &str) -> usize
where
    G: Gateway + ?Sized,
{
    let Some(host) = host_of(url) else {
        return 0;
    };
    if is_social_host(&host) {
        return 0;
    }
    let Some(body) = fetch_page(gateway, url).await else {
        return 0;
    };
    if !is_aggregator_host(&host) {
        return absorb_page(signals, &body, url);
    }

    let unwrapped = unwrap_aggregator(&body, &host);
    let mut emails_added = signals.extend(
        unwrapped
            .emails
            .iter()
            .map(|email| ContactSignal::email(email, SignalSource::SitePage, url)),
    );
    emails_added += absorb_page(signals, &body, url);
    tracing::debug!(
        page = %url,
        outbound = unwrapped.links.len(),
        "unwrapping link-in-bio page"
    );
    for link in &unwrapped.links {
        if let Some(body) = fetch_page(gateway, link).await {
            emails_added += absorb_page(signals, &body, link);
        }
    }
    emails_added
}

/// Adds a page's emails and phones to `signals`; returns the number of new emails.
fn absorb_page(signals: &mut SignalSet, body: &str, page: &str) -> usize {
    let emails = signals.extend(
        extract_emails(body)
            .iter()
            .map(|email| ContactSignal::email(email, SignalSource::SitePage, page)),
    );
    signals.extend(
        extract_phones(body)
            .iter()
            .map(|phone| ContactSignal::phone(phone, SignalSource::SitePage, page)),
    );
    emails
}

async fn fetch_page<G>(gateway: &G, url: &str) -> Option<String>
where
    G: Gateway + ?Sized,
{
    match gateway.fetch(url).await {
        Ok(response) if response.is_success() => Some(response.body),
        Ok(response) => {
            tracing::debug!(page = %url, status = response.status, "page miss");
            None
        }
        Err(e) => {
            tracing::debug!(page = %url, error = %e, "page fetch failed");
            None
        }
    }
}
