//! Run-scoped memo maps with single-flight initialization.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use scout_core::{MxHost, ResolvedDomain, VerificationResult};
use tokio::sync::{Mutex, OnceCell};

/// A map from key to a lazily computed value.
///
/// The first caller for a key runs the initializer; concurrent callers for
/// the same key wait on that run instead of starting their own. If the
/// running caller is cancelled, the next waiter takes over.
pub struct SingleFlight<V> {
    cells: Mutex<HashMap<String, Arc<OnceCell<V>>>>,
}

impl<V> Default for SingleFlight<V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> SingleFlight<V> {
    pub async fn get_or_init<F, Fut>(&self, key: &str, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(key.to_owned()).or_default())
        };
        cell.get_or_init(init).await.clone()
    }

    /// The cached value for `key`, if one has been computed.
    pub async fn peek(&self, key: &str) -> Option<V> {
        let cells = self.cells.lock().await;
        cells.get(key).and_then(|cell| cell.get().cloned())
    }
}

/// Everything shared across leads for the duration of one run.
#[derive(Default)]
pub struct RunCaches {
    /// Keyed by normalized company name, or `site:<host>` for website domains.
    pub domains: SingleFlight<ResolvedDomain>,
    /// Keyed by lowercase domain; an empty list means "accepts no mail".
    pub mx: SingleFlight<Vec<MxHost>>,
    /// Keyed by lowercase address.
    pub verifications: SingleFlight<VerificationResult>,
    catch_all_domains: Mutex<HashSet<String>>,
    unreachable_hosts: Mutex<HashSet<String>>,
}

impl RunCaches {
    pub async fn mark_catch_all(&self, domain: &str) {
        self.catch_all_domains
            .lock()
            .await
            .insert(domain.to_ascii_lowercase());
    }

    pub async fn is_catch_all(&self, domain: &str) -> bool {
        self.catch_all_domains
            .lock()
            .await
            .contains(&domain.to_ascii_lowercase())
    }

    /// Records an MX host that refused or never answered a connection.
    pub async fn mark_unreachable(&self, host: &str) {
        self.unreachable_hosts
            .lock()
            .await
            .insert(host.to_ascii_lowercase());
    }

    pub async fn is_unreachable(&self, host: &str) -> bool {
        self.unreachable_hosts
            .lock()
            .await
            .contains(&host.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_initialization() {
        let flight = Arc::new(SingleFlight::<u32>::default());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = Arc::clone(&flight);
                let runs = Arc::clone(&runs);
                tokio::spawn(async move {
                    flight
                        .get_or_init("acme", || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            42
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_initialize_independently() {
        let flight = SingleFlight::<String>::default();
        let a = flight.get_or_init("a", || async { "alpha".to_owned() }).await;
        let b = flight.get_or_init("b", || async { "beta".to_owned() }).await;
        assert_eq!((a.as_str(), b.as_str()), ("alpha", "beta"));
        assert_eq!(flight.peek("a").await.as_deref(), Some("alpha"));
        assert_eq!(flight.peek("missing").await, None);
    }

    #[tokio::test]
    async fn cancelled_initializer_hands_over_to_next_caller() {
        let flight = SingleFlight::<u32>::default();
        let stalled = tokio::time::timeout(
            Duration::from_millis(10),
            flight.get_or_init("k", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                1
            }),
        )
        .await;
        assert!(stalled.is_err());
        let value = flight.get_or_init("k", || async { 2 }).await;
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn catch_all_marks_are_case_insensitive() {
        let caches = RunCaches::default();
        caches.mark_catch_all("Acme.Test").await;
        assert!(caches.is_catch_all("acme.test").await);
        assert!(!caches.is_catch_all("globex.test").await);
    }
}
