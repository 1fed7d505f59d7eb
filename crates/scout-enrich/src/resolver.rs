//! Company domain resolution.
//!
//! A lead's own website wins when its host accepts mail (`Exact`). Otherwise
//! a slug built from the company hint is tried against a short TLD list and
//! the first domain with MX records is taken (`Fuzzy`). Both outcomes are
//! memoized for the whole run, as are the MX lookups underneath them.

use scout_core::{CompanyHint, MxHost, ResolutionConfidence, ResolvedDomain};
use scout_gateway::{Gateway, GatewayError};

use crate::cache::RunCaches;
use crate::domain::{host_of, is_aggregator_host, is_social_host, mail_domain_candidates};

/// TLDs tried, in order, when guessing a domain from a company name.
const GUESS_TLDS: &[&str] = &["com", "io", "co", "net"];

/// Slugs this short collide with too many unrelated domains.
const MIN_SLUG_LEN: usize = 3;

/// MX hosts for `domain`, looked up once per run.
///
/// Lookup failures are cached as an empty list so a flaky resolver does not
/// get hammered by every lead sharing the domain.
pub async fn lookup_mx<G>(gateway: &G, caches: &RunCaches, domain: &str) -> Vec<MxHost>
where
    G: Gateway + ?Sized,
{
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    caches
        .mx
        .get_or_init(&domain, || fetch_mx(gateway, &domain))
        .await
}

async fn fetch_mx<G>(gateway: &G, domain: &str) -> Vec<MxHost>
where
    G: Gateway + ?Sized,
{
    match gateway.resolve_mx(domain).await {
        Ok(hosts) => hosts,
        Err(GatewayError::NoMailExchange { .. }) => {
            tracing::debug!(domain, "domain accepts no mail");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(domain, error = %e, "MX lookup failed");
            Vec::new()
        }
    }
}

/// Resolves the lead's company domain from its website, then its company hint.
pub async fn resolve_domain<G>(
    gateway: &G,
    caches: &RunCaches,
    website: Option<&str>,
    hint: Option<&CompanyHint>,
) -> ResolvedDomain
where
    G: Gateway + ?Sized,
{
    if let Some(site) = website {
        if let Some(resolved) = resolve_website(gateway, caches, site).await {
            return resolved;
        }
    }
    match hint {
        Some(hint) => resolve_company(gateway, caches, hint).await,
        None => ResolvedDomain::none(),
    }
}

/// `Exact` resolution from a website URL, or `None` when the host is a social
/// or link-in-bio platform or accepts no mail.
pub async fn resolve_website<G>(
    gateway: &G,
    caches: &RunCaches,
    website: &str,
) -> Option<ResolvedDomain>
where
    G: Gateway + ?Sized,
{
    let host = host_of(website)?;
    if is_social_host(&host) || is_aggregator_host(&host) {
        return None;
    }
    let key = format!("site:{host}");
    let resolved = caches
        .domains
        .get_or_init(&key, || validate_site(gateway, caches, &host))
        .await;
    resolved.is_resolved().then_some(resolved)
}

async fn validate_site<G>(gateway: &G, caches: &RunCaches, host: &str) -> ResolvedDomain
where
    G: Gateway + ?Sized,
{
    for candidate in mail_domain_candidates(host) {
        let mx_hosts = lookup_mx(gateway, caches, &candidate).await;
        if !mx_hosts.is_empty() {
            tracing::debug!(host, domain = %candidate, "website domain accepts mail");
            return ResolvedDomain {
                domain: Some(candidate),
                confidence: ResolutionConfidence::Exact,
                mx_hosts,
            };
        }
    }
    ResolvedDomain::none()
}

/// `Fuzzy` resolution from a company hint, memoized by normalized name.
pub async fn resolve_company<G>(gateway: &G, caches: &RunCaches, hint: &CompanyHint) -> ResolvedDomain
where
    G: Gateway + ?Sized,
{
    if hint.normalized.is_empty() {
        return ResolvedDomain::none();
    }
    caches
        .domains
        .get_or_init(&hint.normalized, || guess_company_domain(gateway, caches, &hint.normalized))
        .await
}

async fn guess_company_domain<G>(gateway: &G, caches: &RunCaches, normalized: &str) -> ResolvedDomain
where
    G: Gateway + ?Sized,
{
    let Some(slug) = company_slug(normalized) else {
        return ResolvedDomain::none();
    };
    for tld in GUESS_TLDS {
        let domain = format!("{slug}.{tld}");
        let mx_hosts = lookup_mx(gateway, caches, &domain).await;
        if !mx_hosts.is_empty() {
            tracing::debug!(company = normalized, %domain, "guessed company domain");
            return ResolvedDomain {
                domain: Some(domain),
                confidence: ResolutionConfidence::Fuzzy,
                mx_hosts,
            };
        }
    }
    tracing::debug!(company = normalized, "no guessed domain accepts mail");
    ResolvedDomain::none()
}

/// ASCII alphanumerics of the normalized company name, or `None` when too short.
fn company_slug(normalized: &str) -> Option<String> {
    let slug: String = normalized
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    (slug.len() >= MIN_SLUG_LEN).then_some(slug)
}
