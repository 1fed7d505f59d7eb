//! MX lookups through the system-independent hickory resolver.

use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use scout_core::MxHost;

use crate::error::GatewayError;

pub(crate) struct MxResolver {
    inner: TokioAsyncResolver,
}

impl MxResolver {
    pub(crate) fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            inner: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }

    /// Mail exchanges for `domain`, best preference first.
    ///
    /// NXDOMAIN, an empty answer and a lone null MX (`0 .`) all map to
    /// [`GatewayError::NoMailExchange`].
    pub(crate) async fn lookup(&self, domain: &str) -> Result<Vec<MxHost>, GatewayError> {
        match self.inner.mx_lookup(domain).await {
            Ok(lookup) => {
                let hosts = order_mx_records(
                    lookup
                        .iter()
                        .map(|mx| (mx.preference(), mx.exchange().to_utf8())),
                );
                if hosts.is_empty() {
                    Err(GatewayError::NoMailExchange {
                        domain: domain.to_owned(),
                    })
                } else {
                    Ok(hosts)
                }
            }
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                Err(GatewayError::NoMailExchange {
                    domain: domain.to_owned(),
                })
            }
            Err(source) => Err(GatewayError::Dns {
                domain: domain.to_owned(),
                source,
            }),
        }
    }
}

/// Normalizes raw `(preference, exchange)` pairs.
///
/// Trailing dots are trimmed, null exchanges dropped, duplicates removed and
/// the result sorted by preference then name.
pub(crate) fn order_mx_records(records: impl IntoIterator<Item = (u16, String)>) -> Vec<MxHost> {
    let mut hosts: Vec<MxHost> = records
        .into_iter()
        .filter_map(|(preference, exchange)| {
            let exchange = exchange.trim_end_matches('.').to_ascii_lowercase();
            (!exchange.is_empty()).then_some(MxHost {
                exchange,
                preference,
            })
        })
        .collect();
    hosts.sort_by(|a, b| {
        a.preference
            .cmp(&b.preference)
            .then_with(|| a.exchange.cmp(&b.exchange))
    });
    hosts.dedup_by(|a, b| a.exchange == b.exchange);
    hosts
}
