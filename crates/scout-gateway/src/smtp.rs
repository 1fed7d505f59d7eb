//! Single-session SMTP mailbox probe.
//!
//! One connection per probe: `MAIL FROM`, `RCPT TO` for the candidate and,
//! when that is accepted, a second `RCPT TO` for a random local part on the
//! same domain. Nothing is ever sent past `RCPT`.

use std::time::Duration;

use lettre::transport::smtp::client::AsyncSmtpConnection;
use lettre::transport::smtp::commands::{Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::response::Code;
use lettre::Address;
use scout_core::{ConfigError, VerificationResult, VerificationStatus};

use crate::error::GatewayError;

const SMTP_PORT: u16 = 25;

/// Reply text that points at our own IP or sender being refused rather than
/// the mailbox. Checked before the rejection codes.
const BLOCK_PHRASES: &[&str] = &[
    "blocked",
    "blacklist",
    "blocklist",
    "spamhaus",
    "reputation",
    "policy",
    "not permitted",
    "relay",
    "too many",
];

const UNKNOWN_MAILBOX_PHRASES: &[&str] = &[
    "does not exist",
    "no such user",
    "user unknown",
    "unknown user",
    "recipient not found",
    "invalid mailbox",
    "mailbox unavailable",
    "invalid recipient",
    "address rejected",
    "nosuchuser",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RcptVerdict {
    Accepted,
    Rejected,
    Inconclusive,
}

/// Interprets a `RCPT TO` reply.
///
/// 2xx accepts. 550, 551 and 553, or any 5xx that names an unknown
/// mailbox, reject. 4xx (greylisting), block-list replies and missing codes
/// are inconclusive.
pub(crate) fn classify_rcpt(code: Option<u16>, message: &str) -> RcptVerdict {
    let lower = message.to_ascii_lowercase();
    match code {
        Some(200..=299) => RcptVerdict::Accepted,
        Some(500..=599) if BLOCK_PHRASES.iter().any(|p| lower.contains(p)) => {
            RcptVerdict::Inconclusive
        }
        Some(550 | 551 | 553) => RcptVerdict::Rejected,
        Some(500..=599) if UNKNOWN_MAILBOX_PHRASES.iter().any(|p| lower.contains(p)) => {
            RcptVerdict::Rejected
        }
        _ => RcptVerdict::Inconclusive,
    }
}

fn code_value(code: Code) -> Option<u16> {
    code.to_string().parse().ok()
}

pub(crate) struct SmtpProber {
    helo: ClientId,
    sender: Address,
    timeout: Duration,
}

impl SmtpProber {
    pub(crate) fn new(helo: &str, sender: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let sender = sender
            .parse::<Address>()
            .map_err(|_| ConfigError::InvalidSender(sender.to_owned()))?;
        Ok(Self {
            helo: ClientId::Domain(helo.to_owned()),
            sender,
            timeout,
        })
    }

    /// Probes `address` on `mx_host`.
    ///
    /// Connection failures are returned as errors; every reply the server
    /// actually gave is mapped to a [`VerificationResult`].
    pub(crate) async fn probe(
        &self,
        mx_host: &str,
        address: &str,
    ) -> Result<VerificationResult, GatewayError> {
        let recipient = address
            .parse::<Address>()
            .map_err(|e| GatewayError::InvalidAddress {
                address: address.to_owned(),
                reason: e.to_string(),
            })?;

        let connect = AsyncSmtpConnection::connect_tokio1(
            (mx_host, SMTP_PORT),
            Some(self.timeout),
            &self.helo,
            None,
            None,
        );
        let mut conn = match tokio::time::timeout(self.timeout, connect).await {
            Err(_) => {
                return Err(GatewayError::SmtpTimeout {
                    host: mx_host.to_owned(),
                })
            }
            Ok(Err(source)) => {
                return Err(GatewayError::Smtp {
                    host: mx_host.to_owned(),
                    source,
                })
            }
            Ok(Ok(conn)) => conn,
        };

        // Three commands at most, each bounded by the socket timeout.
        let session = tokio::time::timeout(self.timeout * 3, self.session(&mut conn, &recipient)).await;
        if let Err(e) = conn.quit().await {
            tracing::debug!(mx_host, error = %e, "SMTP QUIT failed");
        }
        match session {
            Ok(result) => {
                tracing::debug!(
                    mx_host,
                    address,
                    status = %result.status,
                    smtp_code = ?result.smtp_code,
                    "SMTP probe finished"
                );
                Ok(result)
            }
            Err(_) => Err(GatewayError::SmtpTimeout {
                host: mx_host.to_owned(),
            }),
        }
    }

    async fn session(
        &self,
        conn: &mut AsyncSmtpConnection,
        recipient: &Address,
    ) -> VerificationResult {
        let address = recipient.to_string();

        if let Err(e) = conn
            .command(Mail::new(Some(self.sender.clone()), vec![]))
            .await
        {
            return VerificationResult {
                address,
                status: VerificationStatus::Blocked,
                smtp_code: e.status().and_then(code_value),
                detail: format!("MAIL FROM rejected: {e}"),
            };
        }

        let (code, message) = match conn.command(Rcpt::new(recipient.clone(), vec![])).await {
            Ok(response) => (
                code_value(response.code()),
                response.message().collect::<Vec<_>>().join(" "),
            ),
            Err(e) => (e.status().and_then(code_value), e.to_string()),
        };

        let status = match classify_rcpt(code, &message) {
            RcptVerdict::Accepted => {
                if self.accepts_random_recipient(conn, recipient.domain()).await {
                    VerificationStatus::CatchAll
                } else {
                    VerificationStatus::Valid
                }
            }
            RcptVerdict::Rejected => VerificationStatus::Invalid,
            RcptVerdict::Inconclusive => VerificationStatus::Blocked,
        };

        VerificationResult {
            address,
            status,
            smtp_code: code,
            detail: message,
        }
    }

    async fn accepts_random_recipient(&self, conn: &mut AsyncSmtpConnection, domain: &str) -> bool {
        let probe = format!("zz-nobody-{:016x}@{domain}", rand::random::<u64>());
        let Ok(probe_address) = probe.parse::<Address>() else {
            tracing::warn!(probe, "could not build catch-all probe address");
            return false;
        };
        match conn.command(Rcpt::new(probe_address, vec![])).await {
            Ok(response) => {
                tracing::info!(domain, code = %response.code(), "domain accepts unknown recipients");
                true
            }
            Err(e) => {
                tracing::debug!(domain, error = %e, "catch-all probe rejected");
                false
            }
        }
    }
}
