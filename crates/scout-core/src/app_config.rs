use std::path::PathBuf;

/// How outbound HTTP traffic is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMode {
    None,
    Fixed(String),
    RotatingFile(PathBuf),
    FreePool { source_url: String },
}

impl std::fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyMode::None => write!(f, "none"),
            ProxyMode::Fixed(_) => write!(f, "fixed"),
            ProxyMode::RotatingFile(_) => write!(f, "rotating-file"),
            ProxyMode::FreePool { .. } => write!(f, "free-pool"),
        }
    }
}

#[derive(Clone)]
pub struct ScoutConfig {
    pub log_level: String,
    pub proxy_mode: ProxyMode,
    pub proxy_direct_fallback: bool,
    pub rate_limit_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub lead_deadline_secs: u64,
    pub smtp_timeout_secs: u64,
    pub smtp_helo: String,
    pub smtp_sender: String,
    pub dns_timeout_secs: u64,
    pub concurrency: usize,
    pub exhaustive_harvest: bool,
    pub max_candidates: usize,
    pub hunter_api_key: Option<String>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            proxy_mode: ProxyMode::None,
            proxy_direct_fallback: true,
            rate_limit_delay_ms: 1_000,
            request_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_base_ms: 500,
            lead_deadline_secs: 60,
            smtp_timeout_secs: 10,
            smtp_helo: "scout-verify.local".to_owned(),
            smtp_sender: "verify@scout-verify.local".to_owned(),
            dns_timeout_secs: 5,
            concurrency: 3,
            exhaustive_harvest: false,
            max_candidates: 6,
            hunter_api_key: None,
        }
    }
}

/// Strips `user:pass@` from a proxy URL so it can be logged.
#[must_use]
pub fn redact_proxy(proxy: &str) -> String {
    match proxy.rsplit_once('@') {
        Some((prefix, host)) => {
            let scheme = prefix.split_once("://").map_or("", |(s, _)| s);
            if scheme.is_empty() {
                format!("[redacted]@{host}")
            } else {
                format!("{scheme}://[redacted]@{host}")
            }
        }
        None => proxy.to_owned(),
    }
}

impl std::fmt::Debug for ScoutConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let proxy = match &self.proxy_mode {
            ProxyMode::Fixed(p) => format!("fixed({})", redact_proxy(p)),
            ProxyMode::RotatingFile(path) => format!("rotating-file({})", path.display()),
            other => other.to_string(),
        };
        f.debug_struct("ScoutConfig")
            .field("log_level", &self.log_level)
            .field("proxy_mode", &proxy)
            .field("proxy_direct_fallback", &self.proxy_direct_fallback)
            .field("rate_limit_delay_ms", &self.rate_limit_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("lead_deadline_secs", &self.lead_deadline_secs)
            .field("smtp_timeout_secs", &self.smtp_timeout_secs)
            .field("smtp_helo", &self.smtp_helo)
            .field("smtp_sender", &self.smtp_sender)
            .field("dns_timeout_secs", &self.dns_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("exhaustive_harvest", &self.exhaustive_harvest)
            .field("max_candidates", &self.max_candidates)
            .field(
                "hunter_api_key",
                &self.hunter_api_key.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
