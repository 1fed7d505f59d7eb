//! `enrich` command handler.
//!
//! Reads every profile up front so malformed input fails before any network
//! traffic, then streams enriched records to stdout as JSON lines in input
//! order. Logs go to stderr.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use futures::StreamExt;
use scout_core::{LeadProfile, ScoutConfig};

/// Parses a JSON array of profiles, or one profile per line (blank lines skipped).
pub(crate) fn parse_profiles(text: &str) -> anyhow::Result<Vec<LeadProfile>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("invalid JSON array of lead profiles");
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid lead profile on line {}", i + 1))
        })
        .collect()
}

pub(crate) fn load_profiles(path: &Path) -> anyhow::Result<Vec<LeadProfile>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_profiles(&text)
}

/// Enriches the profiles in `input` and writes one JSON line per lead.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, the enricher
/// cannot be built from `config`, or stdout is closed. Individual lead
/// failures never surface here.
pub(crate) async fn run_enrich(config: &ScoutConfig, input: &Path) -> anyhow::Result<()> {
    let profiles = load_profiles(input)?;
    let enricher = scout_enrich::connect(config)?;
    let total = profiles.len();
    tracing::info!(
        leads = total,
        concurrency = config.concurrency,
        proxies = enricher.gateway().proxy_count().await,
        "starting enrichment run"
    );

    let mut stdout = std::io::stdout().lock();
    let mut leads = enricher.enrich_all(profiles);
    let mut with_email: usize = 0;
    let mut partial: usize = 0;
    while let Some(lead) = leads.next().await {
        with_email += usize::from(lead.email.is_some());
        partial += usize::from(lead.partial);
        serde_json::to_writer(&mut stdout, &lead)?;
        writeln!(stdout)?;
        stdout.flush()?;
    }

    tracing::info!(
        leads = total,
        with_email,
        partial,
        "enrichment run complete"
    );
    Ok(())
}
