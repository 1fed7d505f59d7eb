//! Lead enrichment data model.
//!
//! A [`LeadProfile`] goes in, an [`EnrichedLead`] comes out. Everything in
//! between (signals, patterns, candidates, verification results) is defined
//! here so the gateway and enrichment crates agree on one vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapter::Platform;

/// A normalized social profile as produced by a scraper adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub platform: Platform,
    pub handle: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    /// Platform verification badge.
    #[serde(default)]
    pub is_verified: bool,
}

/// Company name pulled out of headline/bio text.
///
/// `display` keeps the text as written ("Acme Inc"); `normalized` is the
/// lowercase, suffix-free form used for domain guessing and cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyHint {
    pub display: String,
    pub normalized: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionConfidence {
    /// The lead's own website domain, validated by MX.
    Exact,
    /// A domain guessed from the company name, validated by MX.
    Fuzzy,
    None,
}

/// A mail exchange host with its DNS preference (lower is preferred).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxHost {
    pub exchange: String,
    pub preference: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDomain {
    pub domain: Option<String>,
    pub confidence: ResolutionConfidence,
    pub mx_hosts: Vec<MxHost>,
}

impl ResolvedDomain {
    #[must_use]
    pub fn none() -> Self {
        Self {
            domain: None,
            confidence: ResolutionConfidence::None,
            mx_hosts: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.domain.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactKind {
    Email,
    Phone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalSource {
    /// Already present on the scraped profile.
    Profile,
    BioText,
    SitePage,
    EmailFinder,
    GeneratedVerified,
}

impl SignalSource {
    /// Whether the address was seen somewhere rather than guessed.
    #[must_use]
    pub fn is_observed(self) -> bool {
        !matches!(self, SignalSource::GeneratedVerified)
    }
}

/// An email or phone found for a lead, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSignal {
    pub kind: ContactKind,
    pub value: String,
    pub source: SignalSource,
    /// Page URL or text field the value was found in.
    pub location: String,
}

impl ContactSignal {
    #[must_use]
    pub fn email(value: &str, source: SignalSource, location: &str) -> Self {
        Self {
            kind: ContactKind::Email,
            value: value.trim().to_owned(),
            source,
            location: location.to_owned(),
        }
    }

    #[must_use]
    pub fn phone(value: &str, source: SignalSource, location: &str) -> Self {
        Self {
            kind: ContactKind::Phone,
            value: value.trim().to_owned(),
            source,
            location: location.to_owned(),
        }
    }

    /// Uniqueness key: lowercase email, or digits (and leading `+`) for phones.
    #[must_use]
    pub fn normalized(&self) -> String {
        match self.kind {
            ContactKind::Email => self.value.trim().to_lowercase(),
            ContactKind::Phone => self
                .value
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect(),
        }
    }

    /// Domain part of an email signal, lowercased.
    #[must_use]
    pub fn email_domain(&self) -> Option<String> {
        if self.kind != ContactKind::Email {
            return None;
        }
        self.value
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim().to_lowercase())
    }
}

/// Local-part templates over a person's name tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternTemplate {
    #[serde(rename = "first.last")]
    FirstDotLast,
    #[serde(rename = "first_last")]
    FirstUnderscoreLast,
    #[serde(rename = "firstlast")]
    FirstLast,
    #[serde(rename = "f.last")]
    InitialDotLast,
    #[serde(rename = "flast")]
    InitialLast,
    #[serde(rename = "first.l")]
    FirstDotInitial,
    #[serde(rename = "first")]
    First,
}

impl PatternTemplate {
    /// Detection order; earlier entries win ties at equal specificity.
    pub const ALL: [PatternTemplate; 7] = [
        PatternTemplate::FirstDotLast,
        PatternTemplate::FirstUnderscoreLast,
        PatternTemplate::FirstLast,
        PatternTemplate::InitialDotLast,
        PatternTemplate::InitialLast,
        PatternTemplate::FirstDotInitial,
        PatternTemplate::First,
    ];

    /// Fallback ladder used when no pattern is known.
    pub const FALLBACK_LADDER: [PatternTemplate; 4] = [
        PatternTemplate::FirstDotLast,
        PatternTemplate::FirstLast,
        PatternTemplate::First,
        PatternTemplate::InitialDotLast,
    ];

    /// 2 = both full name tokens, 1 = one full token plus an initial, 0 = a single token.
    #[must_use]
    pub fn specificity(self) -> u8 {
        match self {
            PatternTemplate::FirstDotLast
            | PatternTemplate::FirstUnderscoreLast
            | PatternTemplate::FirstLast => 2,
            PatternTemplate::InitialDotLast
            | PatternTemplate::InitialLast
            | PatternTemplate::FirstDotInitial => 1,
            PatternTemplate::First => 0,
        }
    }

    /// Renders the local part for lowercase, already-sanitized name tokens.
    #[must_use]
    pub fn local_part(self, first: &str, last: &str) -> Option<String> {
        let f = first.chars().next()?;
        let l = last.chars().next();
        let local = match self {
            PatternTemplate::FirstDotLast => format!("{first}.{}", non_empty(last)?),
            PatternTemplate::FirstUnderscoreLast => format!("{first}_{}", non_empty(last)?),
            PatternTemplate::FirstLast => format!("{first}{}", non_empty(last)?),
            PatternTemplate::InitialDotLast => format!("{f}.{}", non_empty(last)?),
            PatternTemplate::InitialLast => format!("{f}{}", non_empty(last)?),
            PatternTemplate::FirstDotInitial => format!("{first}.{}", l?),
            PatternTemplate::First => first.to_owned(),
        };
        Some(local)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PatternTemplate::FirstDotLast => "first.last",
            PatternTemplate::FirstUnderscoreLast => "first_last",
            PatternTemplate::FirstLast => "firstlast",
            PatternTemplate::InitialDotLast => "f.last",
            PatternTemplate::InitialLast => "flast",
            PatternTemplate::FirstDotInitial => "first.l",
            PatternTemplate::First => "first",
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl std::fmt::Display for PatternTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An organization's inferred local-part convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPattern {
    pub template: PatternTemplate,
    pub domain: String,
    /// Number of known emails that matched the template.
    pub evidence: usize,
}

/// Why a candidate address is on the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum CandidateOrigin {
    Observed(SignalSource),
    Pattern(PatternTemplate),
    Fallback(PatternTemplate),
}

impl CandidateOrigin {
    /// 0 = observed, 1 = pattern-matched, 2 = fallback ladder.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            CandidateOrigin::Observed(_) => 0,
            CandidateOrigin::Pattern(_) => 1,
            CandidateOrigin::Fallback(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCandidate {
    pub address: String,
    pub origin: CandidateOrigin,
    pub rank: u8,
}

impl EmailCandidate {
    #[must_use]
    pub fn new(address: &str, origin: CandidateOrigin) -> Self {
        Self {
            address: address.trim().to_lowercase(),
            origin,
            rank: origin.rank(),
        }
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.address.rsplit_once('@').map(|(_, d)| d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Valid,
    Invalid,
    /// Connection refused, timeout, greylisting, or any other inconclusive outcome.
    Blocked,
    CatchAll,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Valid => write!(f, "valid"),
            VerificationStatus::Invalid => write!(f, "invalid"),
            VerificationStatus::Blocked => write!(f, "unknown/blocked"),
            VerificationStatus::CatchAll => write!(f, "catch-all-domain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub address: String,
    pub status: VerificationStatus,
    /// SMTP reply code observed for the RCPT command, when a session got that far.
    pub smtp_code: Option<u16>,
    pub detail: String,
}

impl VerificationResult {
    #[must_use]
    pub fn blocked(address: &str, detail: impl Into<String>) -> Self {
        Self {
            address: address.to_owned(),
            status: VerificationStatus::Blocked,
            smtp_code: None,
            detail: detail.into(),
        }
    }
}

/// Terminal artifact of the pipeline; one per input profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedLead {
    pub profile: LeadProfile,
    pub email: Option<String>,
    pub confidence: u8,
    pub phone: Option<String>,
    pub company_domain: Option<String>,
    pub signals: Vec<ContactSignal>,
    pub verification: Option<VerificationResult>,
    /// Other unrejected candidates worth trying by hand; empty when `email` is SMTP-valid.
    #[serde(default)]
    pub possible_emails: Vec<String>,
    /// Overall lead quality (0-100), independent of email `confidence`.
    #[serde(default)]
    pub lead_score: u8,
    /// Set when the per-lead budget ran out and the record was finalized early.
    pub partial: bool,
    pub enriched_at: DateTime<Utc>,
}

impl EnrichedLead {
    /// A record for a lead enrichment could not touch at all.
    #[must_use]
    pub fn unenriched(profile: LeadProfile) -> Self {
        Self {
            phone: profile.phone.clone(),
            profile,
            email: None,
            confidence: 0,
            company_domain: None,
            signals: Vec::new(),
            verification: None,
            possible_emails: Vec::new(),
            lead_score: 0,
            partial: true,
            enriched_at: Utc::now(),
        }
    }
}
