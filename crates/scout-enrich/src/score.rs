//! Confidence scoring for candidate addresses, and the overall lead score.

use scout_core::{
    CandidateOrigin, ContactKind, EmailCandidate, EnrichedLead, SignalSource, VerificationResult,
    VerificationStatus,
};

/// Bio words that mark a lead as running a business.
const BUSINESS_KEYWORDS: &[&str] = &[
    "coach",
    "consultant",
    "ceo",
    "founder",
    "entrepreneur",
    "agency",
    "business",
    "owner",
    "director",
    "manager",
];

/// Score for a candidate of `origin` with verification `status`.
///
/// `None` status means the candidate was never verified (the lead ran out of
/// time first) and scores like an unverifiable one. Invalid candidates are
/// excluded and score `None`.
#[must_use]
pub fn score(origin: CandidateOrigin, status: Option<VerificationStatus>) -> Option<u8> {
    use VerificationStatus::{Blocked, CatchAll, Invalid, Valid};

    let score = match (origin, status) {
        (_, Some(Invalid)) => return None,
        (CandidateOrigin::Observed(_), Some(Valid)) => 100,
        (CandidateOrigin::Observed(_), Some(Blocked | CatchAll) | None) => 75,
        (CandidateOrigin::Pattern(_), Some(Valid)) => 90,
        (CandidateOrigin::Pattern(_), Some(CatchAll)) => 50,
        (CandidateOrigin::Pattern(_), Some(Blocked) | None) => 40,
        (CandidateOrigin::Fallback(_), Some(Valid)) => 70,
        (CandidateOrigin::Fallback(_), Some(Blocked | CatchAll) | None) => 20,
    };
    Some(score)
}

/// The lead's chosen address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub email: String,
    pub confidence: u8,
    pub verification: Option<VerificationResult>,
}

/// Picks the highest-scoring non-invalid candidate; equal scores go to the
/// earlier candidate. `verdicts` may cover only a prefix of `candidates`.
#[must_use]
pub fn choose(candidates: &[EmailCandidate], verdicts: &[VerificationResult]) -> Option<Choice> {
    let mut best: Option<Choice> = None;
    for candidate in candidates {
        let verdict = verdicts.iter().find(|v| v.address == candidate.address);
        let Some(confidence) = score(candidate.origin, verdict.map(|v| v.status)) else {
            continue;
        };
        if best.as_ref().is_some_and(|b| b.confidence >= confidence) {
            continue;
        }
        best = Some(Choice {
            email: candidate.address.clone(),
            confidence,
            verification: verdict.cloned(),
        });
    }
    best
}

/// Candidates other than `chosen` that no mail server has rejected.
#[must_use]
pub fn possible_emails(
    candidates: &[EmailCandidate],
    verdicts: &[VerificationResult],
    chosen: Option<&str>,
) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| chosen != Some(c.address.as_str()))
        .filter(|c| {
            !verdicts
                .iter()
                .any(|v| v.address == c.address && v.status == VerificationStatus::Invalid)
        })
        .map(|c| c.address.clone())
        .collect()
}

/// Lead quality from 0 to 100: reachable contacts, audience size, a website
/// and business wording in the bio.
#[must_use]
pub fn lead_score(lead: &EnrichedLead) -> u8 {
    let mut score: u32 = 0;

    if let Some(email) = lead.email.as_deref() {
        score += 30;
        let from_finder = lead.signals.iter().any(|s| {
            s.kind == ContactKind::Email
                && s.source == SignalSource::EmailFinder
                && s.value.eq_ignore_ascii_case(email)
        });
        if from_finder {
            score += 5;
        }
    }
    if lead.phone.is_some() {
        score += 30;
    }
    if lead.profile.is_verified {
        score += 10;
    }

    let followers = lead.profile.follower_count.unwrap_or(0);
    score += if (5_000..=50_000).contains(&followers) {
        15
    } else if (1_000..=100_000).contains(&followers) {
        10
    } else if followers > 0 {
        5
    } else {
        0
    };

    if lead
        .profile
        .website
        .as_deref()
        .is_some_and(|w| !w.trim().is_empty())
    {
        score += 10;
    }

    let bio = lead.profile.bio.to_lowercase();
    if BUSINESS_KEYWORDS.iter().any(|k| bio.contains(k)) {
        score += 5;
    }

    u8::try_from(score.min(100)).unwrap_or(100)
}
