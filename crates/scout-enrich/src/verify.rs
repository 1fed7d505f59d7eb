//! SMTP verification of email candidates.
//!
//! Each address is probed at most once per run. Mail hosts that refuse or
//! drop a session are remembered so later candidates skip them, and a domain
//! found to accept any local part is never probed again: every address on it
//! is reported as catch-all.

use scout_core::{EmailCandidate, VerificationResult, VerificationStatus};
use scout_gateway::Gateway;

use crate::cache::RunCaches;
use crate::resolver::lookup_mx;

/// Verifies candidates in order, stopping after the first `Valid` one.
pub async fn verify_candidates<G>(
    gateway: &G,
    caches: &RunCaches,
    candidates: &[EmailCandidate],
    verdicts: &mut Vec<VerificationResult>,
) where
    G: Gateway + ?Sized,
{
    for candidate in candidates {
        let verdict = verify_candidate(gateway, caches, candidate).await;
        tracing::debug!(
            address = %verdict.address,
            status = %verdict.status,
            rank = candidate.rank,
            "candidate verified"
        );
        let valid = verdict.status == VerificationStatus::Valid;
        verdicts.push(verdict);
        if valid {
            break;
        }
    }
}

/// Verifies one candidate, reusing any earlier verdict for the same address.
pub async fn verify_candidate<G>(
    gateway: &G,
    caches: &RunCaches,
    candidate: &EmailCandidate,
) -> VerificationResult
where
    G: Gateway + ?Sized,
{
    let address = candidate.address.as_str();
    let Some((_, domain)) = address
        .rsplit_once('@')
        .filter(|(local, domain)| !local.is_empty() && !domain.is_empty())
    else {
        return VerificationResult {
            address: address.to_owned(),
            status: VerificationStatus::Invalid,
            smtp_code: None,
            detail: "malformed address".to_owned(),
        };
    };

    if caches.is_catch_all(domain).await {
        return catch_all(address);
    }

    let verdict = caches
        .verifications
        .get_or_init(address, || probe_address(gateway, caches, address, domain))
        .await;

    if verdict.status == VerificationStatus::Valid && caches.is_catch_all(domain).await {
        return catch_all(address);
    }
    verdict
}

fn catch_all(address: &str) -> VerificationResult {
    VerificationResult {
        address: address.to_owned(),
        status: VerificationStatus::CatchAll,
        smtp_code: None,
        detail: "domain accepts any address".to_owned(),
    }
}

/// Probes MX hosts in preference order until one gives a conclusive answer.
async fn probe_address<G>(
    gateway: &G,
    caches: &RunCaches,
    address: &str,
    domain: &str,
) -> VerificationResult
where
    G: Gateway + ?Sized,
{
    let mx_hosts = lookup_mx(gateway, caches, domain).await;
    if mx_hosts.is_empty() {
        return VerificationResult::blocked(address, "no mail exchange");
    }

    let mut last = VerificationResult::blocked(address, "all mail exchanges unreachable");
    for mx in &mx_hosts {
        let host = mx.exchange.as_str();
        if caches.is_unreachable(host).await {
            tracing::debug!(host, "skipping unreachable mail exchange");
            continue;
        }
        match gateway.smtp_probe(host, address).await {
            Ok(result) if result.status == VerificationStatus::Blocked => {
                tracing::debug!(host, detail = %result.detail, "inconclusive probe, trying next host");
                last = result;
            }
            Ok(result) => {
                if result.status == VerificationStatus::CatchAll {
                    tracing::info!(domain, host, "catch-all domain detected");
                    caches.mark_catch_all(domain).await;
                }
                return result;
            }
            Err(e) => {
                tracing::warn!(host, domain, error = %e, "SMTP probe failed");
                caches.mark_unreachable(host).await;
                last = VerificationResult::blocked(address, e.to_string());
            }
        }
    }
    last
}
