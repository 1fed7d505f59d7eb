//! Per-lead enrichment and the streaming entry point.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use scout_core::{
    CandidateOrigin, ContactSignal, EmailCandidate, EnrichedLead, LeadProfile, ScoutConfig,
    SignalSource, VerificationResult, VerificationStatus,
};
use scout_gateway::{Gateway, NetworkGateway};

use crate::cache::RunCaches;
use crate::candidates::generate_candidates;
use crate::domain::{host_of, is_aggregator_host, parse_loose};
use crate::error::EnrichError;
use crate::extract::{
    extract_bio_links, extract_text_signals, is_acceptable_email, person_name, PersonName,
};
use crate::finder::find_email;
use crate::harvest::{harvest_link, harvest_site, site_pages};
use crate::pattern::detect_pattern;
use crate::resolver::resolve_domain;
use crate::score::{choose, lead_score, possible_emails};
use crate::signals::SignalSet;
use crate::verify::verify_candidates;

/// Location recorded on signals for generated addresses the mail server accepted.
const SMTP_LOCATION: &str = "smtp";

/// Run settings derived from [`ScoutConfig`].
#[derive(Clone)]
pub struct EnrichSettings {
    pub lead_deadline: Duration,
    pub concurrency: usize,
    pub exhaustive_harvest: bool,
    pub max_candidates: usize,
    pub hunter_api_key: Option<String>,
}

impl EnrichSettings {
    /// # Errors
    ///
    /// Returns [`EnrichError::InvalidSetting`] for a zero concurrency, deadline
    /// or candidate cap.
    pub fn from_config(config: &ScoutConfig) -> Result<Self, EnrichError> {
        let settings = Self {
            lead_deadline: Duration::from_secs(config.lead_deadline_secs),
            concurrency: config.concurrency,
            exhaustive_harvest: config.exhaustive_harvest,
            max_candidates: config.max_candidates,
            hunter_api_key: config
                .hunter_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), EnrichError> {
        if self.concurrency == 0 {
            return Err(EnrichError::InvalidSetting {
                setting: "concurrency",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.lead_deadline.is_zero() {
            return Err(EnrichError::InvalidSetting {
                setting: "lead_deadline",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.max_candidates == 0 {
            return Err(EnrichError::InvalidSetting {
                setting: "max_candidates",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for EnrichSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichSettings")
            .field("lead_deadline", &self.lead_deadline)
            .field("concurrency", &self.concurrency)
            .field("exhaustive_harvest", &self.exhaustive_harvest)
            .field("max_candidates", &self.max_candidates)
            .field(
                "hunter_api_key",
                &self.hunter_api_key.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Builds a network-backed [`Enricher`] from configuration.
///
/// # Errors
///
/// Returns [`EnrichError`] when the gateway cannot be built (bad proxy file,
/// invalid SMTP sender) or a setting is out of range.
pub fn connect(config: &ScoutConfig) -> Result<Enricher<NetworkGateway>, EnrichError> {
    let gateway = NetworkGateway::from_config(config)?;
    Enricher::new(config, gateway)
}

/// Enriches leads against one gateway with run-scoped caches.
pub struct Enricher<G> {
    gateway: Arc<G>,
    caches: Arc<RunCaches>,
    settings: Arc<EnrichSettings>,
}

impl<G> Clone for Enricher<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            caches: Arc::clone(&self.caches),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Everything learned about a lead so far; survives a deadline expiry.
#[derive(Default)]
struct LeadProgress {
    stage: &'static str,
    signals: SignalSet,
    name: Option<PersonName>,
    company_domain: Option<String>,
    candidates: Vec<EmailCandidate>,
    verdicts: Vec<VerificationResult>,
}

impl<G: Gateway + 'static> Enricher<G> {
    /// # Errors
    ///
    /// Returns [`EnrichError::InvalidSetting`] when configuration-derived
    /// settings are out of range.
    pub fn new(config: &ScoutConfig, gateway: G) -> Result<Self, EnrichError> {
        Self::with_settings(EnrichSettings::from_config(config)?, gateway)
    }

    /// # Errors
    ///
    /// Returns [`EnrichError::InvalidSetting`] when `settings` are out of range.
    pub fn with_settings(settings: EnrichSettings, gateway: G) -> Result<Self, EnrichError> {
        settings.validate()?;
        Ok(Self {
            gateway: Arc::new(gateway),
            caches: Arc::new(RunCaches::default()),
            settings: Arc::new(settings),
        })
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[must_use]
    pub fn settings(&self) -> &EnrichSettings {
        &self.settings
    }

    /// Enriches `profiles` with at most `concurrency` leads in flight.
    ///
    /// The stream is lazy, yields exactly one record per input in input
    /// order, and ends after the last one. A lead whose worker panics is
    /// emitted unenriched.
    pub fn enrich_all<I>(&self, profiles: I) -> impl Stream<Item = EnrichedLead> + Send + 'static
    where
        I: IntoIterator<Item = LeadProfile>,
        I::IntoIter: Send + 'static,
    {
        let enricher = self.clone();
        let concurrency = self.settings.concurrency;
        stream::iter(profiles)
            .map(move |profile| {
                let enricher = enricher.clone();
                async move {
                    let fallback = profile.clone();
                    match tokio::spawn(async move { enricher.enrich_lead(profile).await }).await {
                        Ok(lead) => lead,
                        Err(e) => {
                            tracing::error!(lead = %fallback.handle, error = %e, "lead worker failed");
                            let mut lead = EnrichedLead::unenriched(fallback);
                            lead.lead_score = lead_score(&lead);
                            lead
                        }
                    }
                }
            })
            .buffered(concurrency)
    }

    /// Runs the full pipeline for one lead within the lead deadline.
    pub async fn enrich_lead(&self, profile: LeadProfile) -> EnrichedLead {
        let started = tokio::time::Instant::now();
        let mut progress = LeadProgress::default();

        let run = tokio::time::timeout(
            self.settings.lead_deadline,
            self.run_pipeline(&profile, &mut progress),
        )
        .await;
        let partial = run.is_err();
        if partial {
            tracing::warn!(
                lead = %profile.handle,
                stage = progress.stage,
                deadline_secs = self.settings.lead_deadline.as_secs(),
                "lead deadline exceeded, finalizing with partial data"
            );
        }

        let lead = self.finalize(profile, progress, partial);
        tracing::info!(
            lead = %lead.profile.handle,
            platform = %lead.profile.platform,
            confidence = lead.confidence,
            lead_score = lead.lead_score,
            has_email = lead.email.is_some(),
            company_domain = lead.company_domain.as_deref().unwrap_or("-"),
            partial,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "lead enriched"
        );
        lead
    }

    async fn run_pipeline(&self, profile: &LeadProfile, progress: &mut LeadProgress) {
        let gateway = self.gateway.as_ref();
        let caches = self.caches.as_ref();

        progress.stage = "extract";
        if let Some(email) = profile
            .email
            .as_deref()
            .filter(|email| is_acceptable_email(email))
        {
            progress
                .signals
                .push(ContactSignal::email(email, SignalSource::Profile, "profile"));
        }
        if let Some(phone) = profile.phone.as_deref() {
            progress
                .signals
                .push(ContactSignal::phone(phone, SignalSource::Profile, "profile"));
        }
        let text = extract_text_signals(profile);
        progress.signals.extend(text.signals);
        progress.name = person_name(&profile.display_name);

        progress.stage = "resolve";
        let resolved = resolve_domain(
            gateway,
            caches,
            profile.website.as_deref(),
            text.company.as_ref(),
        )
        .await;
        progress.company_domain.clone_from(&resolved.domain);
        let domain = resolved.domain.as_deref();

        progress.stage = "harvest";
        let pages = site_pages(profile.website.as_deref(), domain);
        let mut found = harvest_site(
            gateway,
            &mut progress.signals,
            &pages,
            self.settings.exhaustive_harvest,
        )
        .await;
        for link in bio_links(profile) {
            if found > 0 && !self.settings.exhaustive_harvest {
                break;
            }
            found += harvest_link(gateway, &mut progress.signals, &link).await;
        }

        progress.stage = "finder";
        if let (Some(key), Some(name), Some(domain)) = (
            self.settings.hunter_api_key.as_deref(),
            progress.name.as_ref(),
            domain,
        ) {
            if let Some(signal) = find_email(gateway, key, domain, name).await {
                progress.signals.push(signal);
            }
        }

        progress.stage = "candidates";
        let pattern = domain.and_then(|domain| {
            detect_pattern(
                domain,
                progress.signals.emails().map(|s| s.value.as_str()),
                progress.name.as_ref(),
            )
        });
        progress.candidates = generate_candidates(
            &progress.signals.observed_emails(),
            progress.name.as_ref(),
            domain,
            pattern.as_ref(),
            self.settings.max_candidates,
        );

        progress.stage = "verify";
        verify_candidates(
            gateway,
            caches,
            &progress.candidates,
            &mut progress.verdicts,
        )
        .await;
        progress.stage = "done";
    }

    fn finalize(
        &self,
        profile: LeadProfile,
        mut progress: LeadProgress,
        partial: bool,
    ) -> EnrichedLead {
        if progress.candidates.is_empty() {
            progress.candidates = generate_candidates(
                &progress.signals.observed_emails(),
                None,
                None,
                None,
                self.settings.max_candidates,
            );
        }

        let choice = choose(&progress.candidates, &progress.verdicts);

        for verdict in &progress.verdicts {
            let generated = progress.candidates.iter().any(|c| {
                c.address == verdict.address && !matches!(c.origin, CandidateOrigin::Observed(_))
            });
            if generated && verdict.status == VerificationStatus::Valid {
                progress.signals.push(ContactSignal::email(
                    &verdict.address,
                    SignalSource::GeneratedVerified,
                    SMTP_LOCATION,
                ));
            }
        }

        let phone = progress
            .signals
            .first_phone()
            .map(|signal| signal.value.clone())
            .or_else(|| profile.phone.clone());

        let (email, confidence, verification) = match choice {
            Some(choice) => (Some(choice.email), choice.confidence, choice.verification),
            None => (None, 0, None),
        };

        let confirmed = verification
            .as_ref()
            .is_some_and(|v| v.status == VerificationStatus::Valid);
        let alternatives = if confirmed {
            Vec::new()
        } else {
            possible_emails(&progress.candidates, &progress.verdicts, email.as_deref())
        };

        let mut lead = EnrichedLead {
            profile,
            email,
            confidence,
            phone,
            company_domain: progress.company_domain,
            signals: progress.signals.into_vec(),
            verification,
            possible_emails: alternatives,
            lead_score: 0,
            partial,
            enriched_at: Utc::now(),
        };
        lead.lead_score = lead_score(&lead);
        lead
    }
}

/// Bio links to harvest, with an aggregator website first.
fn bio_links(profile: &LeadProfile) -> Vec<String> {
    let mut links = Vec::new();
    if let Some(site) = profile.website.as_deref() {
        if host_of(site).is_some_and(|host| is_aggregator_host(&host)) {
            if let Some(url) = parse_loose(site) {
                links.push(url.to_string());
            }
        }
    }
    for link in extract_bio_links(&profile.bio) {
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
