//! Production [`Gateway`] backed by `reqwest`, hickory and lettre.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use scout_core::{redact_proxy, MxHost, ScoutConfig, VerificationResult};

use crate::agents::random_user_agent;
use crate::dns::MxResolver;
use crate::error::GatewayError;
use crate::origin::{host_key, parse_http_url};
use crate::proxy::{build_direct_client, route_with_failover, ProxyPool, Route};
use crate::rate_limit::HostRateLimiter;
use crate::retry::retry_with_backoff;
use crate::smtp::SmtpProber;
use crate::{FetchResponse, Gateway};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8";

pub struct NetworkGateway {
    direct: reqwest::Client,
    proxies: ProxyPool,
    allow_direct_fallback: bool,
    limiter: HostRateLimiter,
    max_retries: u32,
    backoff_base_ms: u64,
    resolver: MxResolver,
    smtp: SmtpProber,
}

impl NetworkGateway {
    /// Builds the gateway from run configuration.
    ///
    /// SMTP probes always use a direct connection: the configured proxies are
    /// HTTP proxies and cannot carry port-25 traffic.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an unreadable or empty proxy file,
    /// a malformed proxy URL or an invalid SMTP sender, and
    /// [`GatewayError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &ScoutConfig) -> Result<Self, GatewayError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let proxies = ProxyPool::from_mode(&config.proxy_mode, request_timeout)?;
        let smtp = SmtpProber::new(
            &config.smtp_helo,
            &config.smtp_sender,
            Duration::from_secs(config.smtp_timeout_secs),
        )?;

        tracing::info!(
            proxy_mode = %config.proxy_mode,
            direct_fallback = config.proxy_direct_fallback,
            rate_limit_delay_ms = config.rate_limit_delay_ms,
            max_retries = config.max_retries,
            "outbound gateway ready"
        );

        Ok(Self {
            direct: build_direct_client(request_timeout)?,
            proxies,
            allow_direct_fallback: config.proxy_direct_fallback,
            limiter: HostRateLimiter::new(Duration::from_millis(config.rate_limit_delay_ms)),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            resolver: MxResolver::new(Duration::from_secs(config.dns_timeout_secs)),
            smtp,
        })
    }

    /// Current number of proxies in the pool.
    pub async fn proxy_count(&self) -> usize {
        self.proxies.len().await
    }
}

#[async_trait]
impl Gateway for NetworkGateway {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, GatewayError> {
        let target = parse_http_url(url)?;
        let host = host_key(&target);
        self.proxies.refresh_if_stale(&self.direct).await;

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let target = target.clone();
            let host = host.clone();
            async move {
                self.limiter.acquire(&host).await;
                let routed = route_with_failover(
                    &self.proxies,
                    &self.direct,
                    self.allow_direct_fallback,
                    |client, route| send_get(client, target.clone(), host.clone(), route),
                )
                .await?;
                let (status, final_url, body) = routed.value;
                tracing::debug!(
                    host = %host,
                    path = target.path(),
                    status,
                    route = %routed.route,
                    latency_ms = u64::try_from(routed.latency.as_millis()).unwrap_or(u64::MAX),
                    "fetched"
                );
                Ok(FetchResponse {
                    status,
                    body,
                    final_url,
                    route: routed.route,
                    latency: routed.latency,
                })
            }
        })
        .await
    }

    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxHost>, GatewayError> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let domain = domain.clone();
            async move { self.resolver.lookup(&domain).await }
        })
        .await
    }

    async fn smtp_probe(
        &self,
        mx_host: &str,
        address: &str,
    ) -> Result<VerificationResult, GatewayError> {
        let host = mx_host.to_ascii_lowercase();
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let host = host.clone();
            async move {
                self.limiter.acquire(&host).await;
                self.smtp.probe(&host, address).await
            }
        })
        .await
    }
}

/// One GET over `client`, returning `(status, final_url, body)`.
///
/// Connect failures and timeouts on a proxied route are reported as
/// [`GatewayError::Proxy`] so the caller can rotate.
async fn send_get(
    client: reqwest::Client,
    url: reqwest::Url,
    host: String,
    route: Route,
) -> Result<(u16, String, String), GatewayError> {
    // Query strings may carry API keys; errors keep only the host.
    let on_error = |e: reqwest::Error| match &route {
        Route::Proxy(proxy) if e.is_connect() || e.is_timeout() => GatewayError::Proxy {
            proxy: redact_proxy(proxy),
            reason: e.without_url().to_string(),
        },
        _ => GatewayError::Http(e.without_url()),
    };

    let response = client
        .get(url)
        .header(USER_AGENT, random_user_agent())
        .header(ACCEPT, ACCEPT_HTML)
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .send()
        .await
        .map_err(on_error)?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(1);
        return Err(GatewayError::RateLimited {
            host,
            retry_after_secs,
        });
    }
    if status.is_server_error() {
        return Err(GatewayError::ServerError {
            status: status.as_u16(),
            host,
        });
    }

    let final_url = response.url().to_string();
    let body = response.text().await.map_err(on_error)?;
    Ok((status.as_u16(), final_url, body))
}
