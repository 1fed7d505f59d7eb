//! Proxy pool with exclusive leases and failover to a direct connection.
//!
//! Every configured proxy owns a dedicated `reqwest::Client`. A request leases
//! one proxy for its whole duration; other requests pick a free member or wait
//! for one. When a proxy fails at the connection level the request moves to a
//! different member, then to the direct client if fallback is allowed.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scout_core::{normalize_proxy_url, redact_proxy, ConfigError, ProxyMode};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;

use crate::agents::random_user_agent;
use crate::error::GatewayError;

/// How long a fetched free-proxy list is trusted before refetching.
pub const FREE_POOL_TTL: Duration = Duration::from_secs(300);

const FREE_POOL_MAX: usize = 20;

/// Distinct proxies tried for one request before falling back to direct.
const PROXY_ATTEMPTS: usize = 2;

/// The network path a request actually took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Proxy(String),
    Direct,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Proxy(url) => write!(f, "{}", redact_proxy(url)),
            Route::Direct => write!(f, "direct"),
        }
    }
}

struct ProxySlot {
    url: String,
    client: reqwest::Client,
    busy: Arc<Mutex<()>>,
}

/// Exclusive hold on one proxy; released on drop.
pub(crate) struct ProxyLease {
    slot: Arc<ProxySlot>,
    _guard: OwnedMutexGuard<()>,
}

impl ProxyLease {
    pub(crate) fn url(&self) -> &str {
        &self.slot.url
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.slot.client
    }
}

#[derive(Default)]
struct PoolState {
    slots: Vec<Arc<ProxySlot>>,
    fetched_at: Option<Instant>,
}

impl PoolState {
    fn is_stale(&self) -> bool {
        self.fetched_at
            .is_none_or(|at| at.elapsed() >= FREE_POOL_TTL)
    }
}

pub struct ProxyPool {
    state: RwLock<PoolState>,
    free_source: Option<String>,
    cursor: AtomicUsize,
    request_timeout: Duration,
}

impl ProxyPool {
    /// Builds the pool for the configured proxy mode.
    ///
    /// A free pool starts empty and is filled on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the proxy file cannot be read, is empty, or
    /// names a proxy `reqwest` rejects.
    pub fn from_mode(mode: &ProxyMode, request_timeout: Duration) -> Result<Self, ConfigError> {
        match mode {
            ProxyMode::None => Self::from_urls(&[], request_timeout),
            ProxyMode::Fixed(url) => Self::from_urls(&[url.clone()], request_timeout),
            ProxyMode::RotatingFile(path) => {
                Self::from_urls(&read_proxy_file(path)?, request_timeout)
            }
            ProxyMode::FreePool { source_url } => {
                let mut pool = Self::from_urls(&[], request_timeout)?;
                pool.free_source = Some(source_url.clone());
                Ok(pool)
            }
        }
    }

    pub(crate) fn from_urls(urls: &[String], request_timeout: Duration) -> Result<Self, ConfigError> {
        let slots = urls
            .iter()
            .map(|url| build_slot(url, request_timeout))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            state: RwLock::new(PoolState {
                slots,
                fetched_at: None,
            }),
            free_source: None,
            cursor: AtomicUsize::new(0),
            request_timeout,
        })
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Refetches the free-proxy list once its TTL has lapsed.
    ///
    /// The list is always fetched over the direct client. A failed fetch keeps
    /// the previous members and waits another TTL before trying again.
    pub(crate) async fn refresh_if_stale(&self, direct: &reqwest::Client) {
        let Some(source) = &self.free_source else {
            return;
        };
        if !self.state.read().await.is_stale() {
            return;
        }
        let mut state = self.state.write().await;
        if !state.is_stale() {
            return;
        }
        match fetch_free_proxies(direct, source).await {
            Ok(urls) => {
                state.slots = urls
                    .iter()
                    .filter_map(|url| match build_slot(url, self.request_timeout) {
                        Ok(slot) => Some(slot),
                        Err(e) => {
                            tracing::debug!(error = %e, "skipping unusable free proxy");
                            None
                        }
                    })
                    .collect();
                tracing::info!(count = state.slots.len(), "refreshed free proxy pool");
            }
            Err(e) => {
                tracing::warn!(error = %e, "free proxy list fetch failed, keeping previous pool");
            }
        }
        state.fetched_at = Some(Instant::now());
    }

    /// Leases a pool member not in `exclude`, waiting if every candidate is busy.
    ///
    /// Returns `None` when no candidate exists at all.
    pub(crate) async fn acquire(&self, exclude: &[String]) -> Option<ProxyLease> {
        let candidates: Vec<Arc<ProxySlot>> = {
            let state = self.state.read().await;
            state
                .slots
                .iter()
                .filter(|slot| !exclude.contains(&slot.url))
                .cloned()
                .collect()
        };
        if candidates.is_empty() {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        for offset in 0..candidates.len() {
            let slot = &candidates[(start + offset) % candidates.len()];
            if let Ok(guard) = Arc::clone(&slot.busy).try_lock_owned() {
                return Some(ProxyLease {
                    slot: Arc::clone(slot),
                    _guard: guard,
                });
            }
        }
        let slot = Arc::clone(&candidates[start]);
        let guard = Arc::clone(&slot.busy).lock_owned().await;
        Some(ProxyLease {
            slot,
            _guard: guard,
        })
    }
}

/// Result of a routed operation plus the path it took.
#[derive(Debug)]
pub(crate) struct Routed<T> {
    pub value: T,
    pub route: Route,
    /// Duration of the successful attempt only.
    pub latency: Duration,
}

/// Runs `attempt` through the pool, failing over on proxy-level errors.
///
/// Up to two distinct proxies are tried; after that the direct client is used
/// if `allow_direct` is set. With an empty pool the direct client is used
/// straight away. Errors that are not proxy failures end the sequence.
pub(crate) async fn route_with_failover<T, F, Fut>(
    pool: &ProxyPool,
    direct: &reqwest::Client,
    allow_direct: bool,
    mut attempt: F,
) -> Result<Routed<T>, GatewayError>
where
    F: FnMut(reqwest::Client, Route) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut tried: Vec<String> = Vec::new();
    let mut last_err = None;

    while tried.len() < PROXY_ATTEMPTS {
        let Some(lease) = pool.acquire(&tried).await else {
            break;
        };
        let route = Route::Proxy(lease.url().to_owned());
        let started = Instant::now();
        match attempt(lease.client().clone(), route.clone()).await {
            Ok(value) => {
                return Ok(Routed {
                    value,
                    route,
                    latency: started.elapsed(),
                })
            }
            Err(err) if err.is_proxy_failure() => {
                tracing::warn!(proxy = %route, error = %err, "proxy failed, rotating");
                tried.push(lease.url().to_owned());
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    if let Some(err) = last_err {
        if !allow_direct {
            return Err(err);
        }
        tracing::info!(error = %err, "proxies exhausted, falling back to direct connection");
    }

    let started = Instant::now();
    let value = attempt(direct.clone(), Route::Direct).await?;
    Ok(Routed {
        value,
        route: Route::Direct,
        latency: started.elapsed(),
    })
}

/// Client for direct connections; ignores any proxy set in the environment.
pub(crate) fn build_direct_client(request_timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    Ok(reqwest::Client::builder()
        .no_proxy()
        .timeout(request_timeout)
        .connect_timeout(request_timeout)
        .build()?)
}

fn build_slot(url: &str, request_timeout: Duration) -> Result<Arc<ProxySlot>, ConfigError> {
    let invalid = |e: reqwest::Error| ConfigError::InvalidProxy {
        proxy: redact_proxy(url),
        reason: e.to_string(),
    };
    let proxy = reqwest::Proxy::all(url).map_err(invalid)?;
    let client = reqwest::Client::builder()
        .proxy(proxy)
        .timeout(request_timeout)
        .connect_timeout(request_timeout)
        .build()
        .map_err(invalid)?;
    Ok(Arc::new(ProxySlot {
        url: url.to_owned(),
        client,
        busy: Arc::new(Mutex::new(())),
    }))
}

/// One proxy per line; blank lines and `#` comments are skipped.
fn read_proxy_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ProxyFileIo {
        path: path.display().to_string(),
        source,
    })?;
    let proxies: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize_proxy_url)
        .collect();
    if proxies.is_empty() {
        return Err(ConfigError::EmptyProxyFile {
            path: path.display().to_string(),
        });
    }
    Ok(proxies)
}

async fn fetch_free_proxies(
    direct: &reqwest::Client,
    source: &str,
) -> Result<Vec<String>, GatewayError> {
    let body = direct
        .get(source)
        .header(reqwest::header::USER_AGENT, random_user_agent())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_proxy_list(&body))
}

/// Parses a plain `host:port` list, keeping at most [`FREE_POOL_MAX`] entries.
fn parse_proxy_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| {
            let bare = line.split_once("://").map_or(*line, |(_, rest)| rest);
            bare.rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        })
        .map(normalize_proxy_url)
        .take(FREE_POOL_MAX)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::sync::Mutex as StdMutex;

    use super::*;

    fn pool_of(urls: &[&str]) -> ProxyPool {
        let urls: Vec<String> = urls.iter().map(|u| (*u).to_owned()).collect();
        ProxyPool::from_urls(&urls, Duration::from_secs(1)).unwrap()
    }

    fn proxy_down(route: &Route) -> GatewayError {
        GatewayError::Proxy {
            proxy: route.to_string(),
            reason: "connection refused".to_owned(),
        }
    }

    #[tokio::test]
    async fn empty_pool_goes_direct() {
        let pool = pool_of(&[]);
        let direct = build_direct_client(Duration::from_secs(1)).unwrap();
        let routed = route_with_failover(&pool, &direct, false, |_client, route| async move {
            Ok::<_, GatewayError>(route)
        })
        .await
        .unwrap();
        assert_eq!(routed.route, Route::Direct);
        assert_eq!(routed.value, Route::Direct);
    }

    #[tokio::test]
    async fn failing_proxies_rotate_then_fall_back_to_direct() {
        let pool = pool_of(&["http://127.0.0.1:9", "http://127.0.0.2:9", "http://127.0.0.3:9"]);
        let direct = build_direct_client(Duration::from_secs(1)).unwrap();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let routed = route_with_failover(&pool, &direct, true, move |_client, route| {
            let s = Arc::clone(&s);
            async move {
                s.lock().unwrap().push(route.clone());
                match route {
                    Route::Direct => Ok("body"),
                    Route::Proxy(_) => Err(proxy_down(&route)),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(routed.route, Route::Direct);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_ne!(seen[0], seen[1], "second attempt must use a different proxy");
        assert!(matches!(seen[0], Route::Proxy(_)));
        assert!(matches!(seen[1], Route::Proxy(_)));
        assert_eq!(seen[2], Route::Direct);
    }

    #[tokio::test]
    async fn disallowed_direct_fallback_surfaces_proxy_error() {
        let pool = pool_of(&["http://127.0.0.1:9"]);
        let direct = build_direct_client(Duration::from_secs(1)).unwrap();
        let result = route_with_failover(&pool, &direct, false, |_client, route| async move {
            match route {
                Route::Direct => Ok::<_, GatewayError>(()),
                Route::Proxy(_) => Err(proxy_down(&route)),
            }
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_proxy_failure());
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn non_proxy_errors_stop_failover() {
        let pool = pool_of(&["http://127.0.0.1:9", "http://127.0.0.2:9"]);
        let direct = build_direct_client(Duration::from_secs(1)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let result = route_with_failover(&pool, &direct, true, move |_client, _route| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GatewayError::ServerError {
                    status: 503,
                    host: "acme.test".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(GatewayError::ServerError { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_covers_successful_attempt_only() {
        let pool = pool_of(&["http://127.0.0.1:9"]);
        let direct = build_direct_client(Duration::from_secs(1)).unwrap();
        let routed = route_with_failover(&pool, &direct, true, |_client, route| async move {
            match route {
                Route::Proxy(_) => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Err(proxy_down(&route))
                }
                Route::Direct => {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(routed.route, Route::Direct);
        assert_eq!(routed.latency, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn lease_is_exclusive_until_dropped() {
        let pool = pool_of(&["http://127.0.0.1:9"]);
        let lease = pool.acquire(&[]).await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.acquire(&[])).await;
        assert!(blocked.is_err(), "second lease must wait while the first is held");
        drop(lease);
        let again = tokio::time::timeout(Duration::from_millis(50), pool.acquire(&[])).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn free_leases_are_preferred_over_waiting() {
        let pool = pool_of(&["http://127.0.0.1:9", "http://127.0.0.2:9"]);
        let first = pool.acquire(&[]).await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(50), pool.acquire(&[]))
            .await
            .expect("a free member exists")
            .unwrap();
        assert_ne!(first.url(), second.url());
    }

    #[tokio::test]
    async fn excluded_members_are_never_leased() {
        let pool = pool_of(&["http://127.0.0.1:9"]);
        assert!(pool
            .acquire(&["http://127.0.0.1:9".to_owned()])
            .await
            .is_none());
    }

    #[test]
    fn proxy_file_skips_comments_and_normalizes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# office proxies").unwrap();
        writeln!(file, "10.0.0.1:8080").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "socks5://10.0.0.2:1080").unwrap();
        let proxies = read_proxy_file(file.path()).unwrap();
        assert_eq!(proxies, vec!["http://10.0.0.1:8080", "socks5://10.0.0.2:1080"]);
    }

    #[test]
    fn empty_proxy_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        let err = read_proxy_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyProxyFile { .. }));
    }

    #[test]
    fn missing_proxy_file_is_a_config_error() {
        let err = read_proxy_file(Path::new("/nonexistent/proxies.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::ProxyFileIo { .. }));
    }

    #[test]
    fn free_list_parser_drops_garbage_and_caps_size() {
        let mut body = String::from("<html>oops</html>\n1.2.3.4:notaport\n");
        for i in 0..30 {
            body.push_str(&format!("10.0.0.{i}:3128\r\n"));
        }
        let parsed = parse_proxy_list(&body);
        assert_eq!(parsed.len(), FREE_POOL_MAX);
        assert_eq!(parsed[0], "http://10.0.0.0:3128");
    }

    #[test]
    fn route_display_redacts_credentials() {
        let route = Route::Proxy("http://bob:pw@10.0.0.1:8080".to_owned());
        assert_eq!(route.to_string(), "http://[redacted]@10.0.0.1:8080");
        assert_eq!(Route::Direct.to_string(), "direct");
    }
}
