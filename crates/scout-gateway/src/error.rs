use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connect refusal or timeout while routed through a proxy.
    #[error("proxy {proxy} failed: {reason}")]
    Proxy { proxy: String, reason: String },

    #[error("rate limited by {host} (retry after {retry_after_secs}s)")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("server error {status} from {host}")]
    ServerError { status: u16, host: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{domain} has no mail exchange")]
    NoMailExchange { domain: String },

    #[error("DNS lookup for {domain} failed: {source}")]
    Dns {
        domain: String,
        #[source]
        source: hickory_resolver::error::ResolveError,
    },

    #[error("SMTP error from {host}: {source}")]
    Smtp {
        host: String,
        #[source]
        source: lettre::transport::smtp::Error,
    },

    #[error("SMTP session with {host} timed out")]
    SmtpTimeout { host: String },

    #[error("invalid email address \"{address}\": {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] scout_core::ConfigError),
}

impl GatewayError {
    /// Errors worth retrying after a back-off delay.
    ///
    /// Network-level failures, HTTP 429 and 5xx, DNS resolver failures other
    /// than "no records", and SMTP connect timeouts are transient. Anything
    /// the remote side answered definitively (4xx, NXDOMAIN, invalid input)
    /// is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            GatewayError::Proxy { .. }
            | GatewayError::RateLimited { .. }
            | GatewayError::ServerError { .. }
            | GatewayError::Dns { .. }
            | GatewayError::SmtpTimeout { .. } => true,
            GatewayError::Smtp { source, .. } => source.is_timeout(),
            GatewayError::InvalidUrl { .. }
            | GatewayError::NoMailExchange { .. }
            | GatewayError::InvalidAddress { .. }
            | GatewayError::Config(_) => false,
        }
    }

    /// Failures that say more about the proxy than about the destination.
    #[must_use]
    pub fn is_proxy_failure(&self) -> bool {
        matches!(self, GatewayError::Proxy { .. })
    }

    /// Seconds the server asked us to wait, if any.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GatewayError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}
