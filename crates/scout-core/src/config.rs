use crate::app_config::{ProxyMode, ScoutConfig};
use crate::ConfigError;

const DEFAULT_FREE_PROXY_SOURCE: &str =
    "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=http&timeout=1000&country=all&anonymity=anonymous";

/// Load enrichment configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_scout_config() -> Result<ScoutConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_scout_config_from_env()
}

/// Load enrichment configuration from environment variables already in the process.
///
/// Unlike [`load_scout_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_scout_config_from_env() -> Result<ScoutConfig, ConfigError> {
    build_scout_config(|key| std::env::var(key))
}

/// Build configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_scout_config<F>(lookup: F) -> Result<ScoutConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = ScoutConfig::default();

    let present = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_owned(),
        reason,
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        present(var).map_or(Ok(default), |raw| {
            raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_secs = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match parse_u64(var, default)? {
            0 => Err(invalid(var, "must be at least 1".to_owned())),
            secs => Ok(secs),
        }
    };

    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        present(var).map_or(Ok(default), |raw| {
            raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_usize = |var: &str, default: usize| -> Result<usize, ConfigError> {
        present(var).map_or(Ok(default), |raw| {
            raw.parse::<usize>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_flag = |var: &str, default: bool| -> Result<bool, ConfigError> {
        present(var).map_or(Ok(default), |raw| {
            parse_bool(&raw).ok_or_else(|| invalid(var, format!("\"{raw}\" is not a boolean")))
        })
    };

    let proxy_mode = if let Some(proxy) = present("SCOUT_PROXY") {
        ProxyMode::Fixed(normalize_proxy_url(&proxy))
    } else if let Some(path) = present("SCOUT_PROXY_FILE") {
        ProxyMode::RotatingFile(path.into())
    } else if parse_flag("SCOUT_FREE_PROXY", false)? {
        ProxyMode::FreePool {
            source_url: present("SCOUT_FREE_PROXY_SOURCE")
                .unwrap_or_else(|| DEFAULT_FREE_PROXY_SOURCE.to_owned()),
        }
    } else {
        ProxyMode::None
    };

    let concurrency = parse_usize("SCOUT_CONCURRENCY", defaults.concurrency)?;
    if concurrency == 0 {
        return Err(invalid("SCOUT_CONCURRENCY", "must be at least 1".to_owned()));
    }

    let max_candidates = parse_usize("SCOUT_MAX_CANDIDATES", defaults.max_candidates)?;
    if max_candidates == 0 {
        return Err(invalid("SCOUT_MAX_CANDIDATES", "must be at least 1".to_owned()));
    }

    Ok(ScoutConfig {
        log_level: present("SCOUT_LOG_LEVEL").unwrap_or(defaults.log_level),
        proxy_mode,
        proxy_direct_fallback: parse_flag(
            "SCOUT_PROXY_DIRECT_FALLBACK",
            defaults.proxy_direct_fallback,
        )?,
        rate_limit_delay_ms: parse_u64("SCOUT_RATE_LIMIT_DELAY_MS", defaults.rate_limit_delay_ms)?,
        request_timeout_secs: parse_secs(
            "SCOUT_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout_secs,
        )?,
        max_retries: parse_u32("SCOUT_MAX_RETRIES", defaults.max_retries)?,
        retry_backoff_base_ms: parse_u64(
            "SCOUT_RETRY_BACKOFF_BASE_MS",
            defaults.retry_backoff_base_ms,
        )?,
        lead_deadline_secs: parse_secs("SCOUT_LEAD_DEADLINE_SECS", defaults.lead_deadline_secs)?,
        smtp_timeout_secs: parse_secs("SCOUT_SMTP_TIMEOUT_SECS", defaults.smtp_timeout_secs)?,
        smtp_helo: present("SCOUT_SMTP_HELO").unwrap_or(defaults.smtp_helo),
        smtp_sender: present("SCOUT_SMTP_SENDER").unwrap_or(defaults.smtp_sender),
        dns_timeout_secs: parse_secs("SCOUT_DNS_TIMEOUT_SECS", defaults.dns_timeout_secs)?,
        concurrency,
        exhaustive_harvest: parse_flag("SCOUT_EXHAUSTIVE_HARVEST", defaults.exhaustive_harvest)?,
        max_candidates,
        hunter_api_key: present("HUNTER_API_KEY"),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Bare `host:port` proxies get an `http://` scheme.
#[must_use]
pub fn normalize_proxy_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    }
}
