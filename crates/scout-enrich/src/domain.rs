//! URL and host helpers shared by the resolver and the harvester.

/// Hosts that are never a lead's company domain.
const SOCIAL_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "instagram.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "facebook.com",
    "fb.com",
    "spotify.com",
    "bit.ly",
    "linkedin.com",
    "pinterest.com",
    "twitch.tv",
    "github.com",
    "threads.net",
    "snapchat.com",
];

/// Link-in-bio pages: harvested by unwrapping, never used as a domain.
const AGGREGATOR_HOSTS: &[&str] = &[
    "linktr.ee",
    "stan.store",
    "beacons.ai",
    "linkr.bio",
    "bio.link",
];

/// Second-level labels under country-code TLDs (`acme.co.uk`, `acme.com.au`).
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu", "ne", "or"];

/// Parses `url`, adding `https://` when the scheme is missing.
#[must_use]
pub fn parse_loose(url: &str) -> Option<reqwest::Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = reqwest::Url::parse(&with_scheme).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

/// Lowercased host of `url` with any leading `www.` removed.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    let parsed = parse_loose(url)?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").map_or(host.clone(), str::to_owned);
    (host.contains('.') && !host.starts_with('.') && !host.ends_with('.')).then_some(host)
}

/// `scheme://host` of `url`, for building sibling page URLs.
#[must_use]
pub fn site_root(url: &str) -> Option<String> {
    parse_loose(url).map(|u| u.origin().ascii_serialization())
}

fn host_in(host: &str, list: &[&str]) -> bool {
    list.iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}

#[must_use]
pub fn is_social_host(host: &str) -> bool {
    host_in(host, SOCIAL_HOSTS)
}

#[must_use]
pub fn is_aggregator_host(host: &str) -> bool {
    host_in(host, AGGREGATOR_HOSTS)
}

/// Domains to try for mail on a website host: the host itself, then its
/// registrable parent when it is a subdomain (`shop.acme.com` → `acme.com`,
/// `shop.acme.co.uk` → `acme.co.uk`).
#[must_use]
pub fn mail_domain_candidates(host: &str) -> Vec<String> {
    let mut candidates = vec![host.to_owned()];
    let labels: Vec<&str> = host.split('.').collect();
    let n = labels.len();
    let country_second_level =
        n >= 3 && labels[n - 1].len() == 2 && SECOND_LEVEL_LABELS.contains(&labels[n - 2]);
    let suffix_len = if country_second_level { 2 } else { 1 };
    if n > suffix_len + 1 {
        let parent = labels[n - suffix_len - 1..].join(".");
        if parent != host {
            candidates.push(parent);
        }
    }
    candidates
}
