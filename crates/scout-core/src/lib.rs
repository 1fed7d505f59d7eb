//! Shared data model and configuration for the lead enrichment workspace.

pub mod adapter;
pub mod app_config;
pub mod config;
pub mod types;

pub use adapter::{Platform, ScrapeError, ScraperAdapter};
pub use app_config::{redact_proxy, ProxyMode, ScoutConfig};
pub use config::{load_scout_config, load_scout_config_from_env, normalize_proxy_url};
pub use types::{
    CandidateOrigin, CompanyHint, ContactKind, ContactSignal, EmailCandidate, EmailPattern,
    EnrichedLead, LeadProfile, MxHost, PatternTemplate, ResolutionConfidence, ResolvedDomain,
    SignalSource, VerificationResult, VerificationStatus,
};

use thiserror::Error;

/// Fatal configuration problems, surfaced once before any lead is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read proxy file {path}: {source}")]
    ProxyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("proxy file {path} contains no proxies")]
    EmptyProxyFile { path: String },

    #[error("invalid proxy \"{proxy}\": {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("invalid SMTP sender address \"{0}\"")]
    InvalidSender(String),
}
