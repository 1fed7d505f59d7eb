//! Third-party email finder (Hunter `email-finder`).
//!
//! Only used when an API key is configured. Any failure means "no signal".

use scout_core::{ContactSignal, SignalSource};
use scout_gateway::Gateway;
use serde::Deserialize;

use crate::extract::{is_acceptable_email, PersonName};

const FINDER_ENDPOINT: &str = "https://api.hunter.io/v2/email-finder";

/// Recorded as the signal location; never the request URL, which carries the key.
const FINDER_LOCATION: &str = "hunter.io";

#[derive(Debug, Deserialize)]
struct FinderResponse {
    data: Option<FinderData>,
}

#[derive(Debug, Deserialize)]
struct FinderData {
    email: Option<String>,
}

pub(crate) fn finder_url(domain: &str, name: &PersonName, api_key: &str) -> Option<reqwest::Url> {
    reqwest::Url::parse_with_params(
        FINDER_ENDPOINT,
        &[
            ("domain", domain),
            ("first_name", name.first.as_str()),
            ("last_name", name.last.as_str()),
            ("api_key", api_key),
        ],
    )
    .ok()
}

/// The address in a finder response body, if it passes the hygiene filter.
fn parse_finder_response(body: &str) -> Option<String> {
    let response: FinderResponse = serde_json::from_str(body).ok()?;
    let email = response.data?.email?.trim().to_lowercase();
    is_acceptable_email(&email).then_some(email)
}

/// Asks the finder for `name` at `domain`.
pub async fn find_email<G>(
    gateway: &G,
    api_key: &str,
    domain: &str,
    name: &PersonName,
) -> Option<ContactSignal>
where
    G: Gateway + ?Sized,
{
    let url = finder_url(domain, name, api_key)?;
    let response = match gateway.fetch(url.as_str()).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            tracing::debug!(domain, status = response.status, "email finder returned no result");
            return None;
        }
        Err(e) => {
            tracing::warn!(domain, error = %e, "email finder request failed");
            return None;
        }
    };
    let email = parse_finder_response(&response.body)?;
    tracing::debug!(domain, "email finder returned an address");
    Some(ContactSignal::email(
        &email,
        SignalSource::EmailFinder,
        FINDER_LOCATION,
    ))
}
