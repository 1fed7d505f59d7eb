//! Outbound request gateway.
//!
//! Every network operation the enrichment pipeline performs goes through a
//! [`Gateway`]: HTTP fetches, MX lookups and SMTP probes. [`NetworkGateway`]
//! is the production implementation with proxy routing, per-host rate
//! limiting and retry with back-off.

pub mod agents;
pub(crate) mod dns;
pub mod error;
pub mod network;
pub(crate) mod origin;
pub mod proxy;
pub mod rate_limit;
pub(crate) mod retry;
pub(crate) mod smtp;

use std::time::Duration;

use async_trait::async_trait;
use scout_core::{MxHost, VerificationResult};

pub use error::GatewayError;
pub use network::NetworkGateway;
pub use proxy::{ProxyPool, Route, FREE_POOL_TTL};
pub use rate_limit::HostRateLimiter;

/// A completed HTTP exchange. Any status below 500 other than 429 lands here.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    /// URL after redirects.
    pub final_url: String,
    pub route: Route,
    pub latency: Duration,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// GET `url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] once retries and proxy failover are exhausted,
    /// or immediately for non-transient failures.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, GatewayError>;

    /// MX hosts for `domain`, best preference first.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoMailExchange`] when the domain accepts no mail;
    /// [`GatewayError::Dns`] when the resolver itself failed.
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxHost>, GatewayError>;

    /// Runs one mailbox probe against `mx_host`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when no SMTP conversation could be held.
    async fn smtp_probe(
        &self,
        mx_host: &str,
        address: &str,
    ) -> Result<VerificationResult, GatewayError>;
}
