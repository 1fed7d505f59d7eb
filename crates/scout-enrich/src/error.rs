use scout_core::ConfigError;
use scout_gateway::GatewayError;
use thiserror::Error;

/// Setup failures. Per-lead problems never surface as errors; they only
/// lower the lead's confidence.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("invalid setting {setting}: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },
}
