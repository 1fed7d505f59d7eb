//! Deterministic in-memory [`Gateway`] for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scout_core::{MxHost, VerificationResult, VerificationStatus};
use scout_gateway::{FetchResponse, Gateway, GatewayError, Route};

/// Scripted responses plus call recording.
///
/// Unknown pages answer 404, unknown domains have no MX, and unknown
/// mailboxes are rejected with 550.
#[derive(Default)]
pub(crate) struct StubGateway {
    pages: HashMap<String, String>,
    mx: HashMap<String, Vec<MxHost>>,
    mailboxes: HashMap<String, VerificationStatus>,
    catch_all: HashSet<String>,
    unreachable: HashSet<String>,
    panic_pages: HashSet<String>,
    fetch_delay: Duration,
    smtp_delay: Duration,
    fetches: Mutex<Vec<String>>,
    mx_lookups: Mutex<HashMap<String, usize>>,
    probes: Mutex<Vec<(String, String)>>,
}

impl StubGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_owned(), body.to_owned());
        self
    }

    /// Adds an MX host; later hosts get a worse preference.
    pub(crate) fn mx(mut self, domain: &str, exchange: &str) -> Self {
        let hosts = self.mx.entry(domain.to_owned()).or_default();
        let preference = u16::try_from(hosts.len() * 10 + 10).unwrap_or(u16::MAX);
        hosts.push(MxHost {
            exchange: exchange.to_owned(),
            preference,
        });
        self
    }

    pub(crate) fn mailbox(mut self, address: &str, status: VerificationStatus) -> Self {
        self.mailboxes.insert(address.to_owned(), status);
        self
    }

    pub(crate) fn catch_all(mut self, domain: &str) -> Self {
        self.catch_all.insert(domain.to_owned());
        self
    }

    /// Probes against `mx_host` fail at connect time.
    pub(crate) fn unreachable(mut self, mx_host: &str) -> Self {
        self.unreachable.insert(mx_host.to_owned());
        self
    }

    /// Fetching `url` panics, taking the calling task down with it.
    pub(crate) fn panic_on(mut self, url: &str) -> Self {
        self.panic_pages.insert(url.to_owned());
        self
    }

    pub(crate) fn fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub(crate) fn smtp_delay(mut self, delay: Duration) -> Self {
        self.smtp_delay = delay;
        self
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub(crate) fn mx_lookups_for(&self, domain: &str) -> usize {
        self.mx_lookups
            .lock()
            .unwrap()
            .get(domain)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_mx_lookups(&self) -> usize {
        self.mx_lookups.lock().unwrap().values().sum()
    }

    /// `(mx_host, address)` pairs in probe order.
    pub(crate) fn probes(&self) -> Vec<(String, String)> {
        self.probes.lock().unwrap().clone()
    }
}

fn reply_code(status: VerificationStatus) -> u16 {
    match status {
        VerificationStatus::Valid | VerificationStatus::CatchAll => 250,
        VerificationStatus::Invalid => 550,
        VerificationStatus::Blocked => 451,
    }
}

#[async_trait]
impl Gateway for StubGateway {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, GatewayError> {
        self.fetches.lock().unwrap().push(url.to_owned());
        assert!(!self.panic_pages.contains(url), "stub gateway panic on {url}");
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        let body = self
            .pages
            .get(url)
            .or_else(|| self.pages.get(url.trim_end_matches('/')));
        Ok(FetchResponse {
            status: if body.is_some() { 200 } else { 404 },
            body: body.cloned().unwrap_or_default(),
            final_url: url.to_owned(),
            route: Route::Direct,
            latency: self.fetch_delay,
        })
    }

    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxHost>, GatewayError> {
        *self
            .mx_lookups
            .lock()
            .unwrap()
            .entry(domain.to_owned())
            .or_default() += 1;
        self.mx
            .get(domain)
            .cloned()
            .ok_or_else(|| GatewayError::NoMailExchange {
                domain: domain.to_owned(),
            })
    }

    async fn smtp_probe(
        &self,
        mx_host: &str,
        address: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.probes
            .lock()
            .unwrap()
            .push((mx_host.to_owned(), address.to_owned()));
        if !self.smtp_delay.is_zero() {
            tokio::time::sleep(self.smtp_delay).await;
        }
        if self.unreachable.contains(mx_host) {
            return Err(GatewayError::SmtpTimeout {
                host: mx_host.to_owned(),
            });
        }
        let domain = address.rsplit_once('@').map_or("", |(_, d)| d);
        let status = if self.catch_all.contains(domain) {
            VerificationStatus::CatchAll
        } else {
            self.mailboxes
                .get(address)
                .copied()
                .unwrap_or(VerificationStatus::Invalid)
        };
        Ok(VerificationResult {
            address: address.to_owned(),
            status,
            smtp_code: Some(reply_code(status)),
            detail: format!("stub {status}"),
        })
    }
}
