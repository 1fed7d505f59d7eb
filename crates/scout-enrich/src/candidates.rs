//! Ordered, deduplicated email candidates for one lead.

use std::collections::HashSet;

use scout_core::{CandidateOrigin, ContactSignal, EmailCandidate, EmailPattern, PatternTemplate};

use crate::extract::PersonName;

/// Builds the ordered candidate list for one lead.
///
/// Observed addresses come first (in the order given), then the detected
/// pattern's address when the pattern belongs to `domain`, then the fallback
/// ladder. Without a two-token name or a domain only observed addresses
/// survive. No address appears twice and at most `max` are returned.
///
/// The cap never squeezes out the pattern candidate or the first ladder
/// step: observed addresses give up their tail slots to them instead.
#[must_use]
pub fn generate_candidates(
    observed: &[&ContactSignal],
    name: Option<&PersonName>,
    domain: Option<&str>,
    pattern: Option<&EmailPattern>,
    max: usize,
) -> Vec<EmailCandidate> {
    let mut known = CandidateList::default();
    for signal in observed {
        known.push(EmailCandidate::new(
            &signal.value,
            CandidateOrigin::Observed(signal.source),
        ));
    }

    let mut guessed = CandidateList::default();
    if let (Some(name), Some(domain)) = (name, domain) {
        let domain = domain.to_ascii_lowercase();
        if let Some(pattern) = pattern.filter(|p| p.domain.eq_ignore_ascii_case(&domain)) {
            guessed.push_generated(name, &domain, CandidateOrigin::Pattern(pattern.template));
        }
        for template in PatternTemplate::FALLBACK_LADDER {
            guessed.push_generated(name, &domain, CandidateOrigin::Fallback(template));
        }
    }

    // Slots held back for the pattern address and the first new ladder step.
    let fresh = |c: &&EmailCandidate| !known.seen.contains(&c.address);
    let pattern_slot = guessed
        .candidates
        .iter()
        .filter(fresh)
        .any(|c| c.rank == 1);
    let ladder_slot = guessed
        .candidates
        .iter()
        .filter(fresh)
        .any(|c| c.rank == 2);
    let reserved = (usize::from(pattern_slot) + usize::from(ladder_slot)).min(max);

    let mut list = CandidateList::default();
    for candidate in known.candidates.into_iter().take(max - reserved) {
        list.push(candidate);
    }
    for candidate in guessed.candidates {
        if list.candidates.len() >= max {
            break;
        }
        list.push(candidate);
    }
    list.candidates
}

#[derive(Default)]
struct CandidateList {
    candidates: Vec<EmailCandidate>,
    seen: HashSet<String>,
}

impl CandidateList {
    fn push(&mut self, candidate: EmailCandidate) {
        let has_domain = candidate.domain().is_some_and(|d| !d.is_empty());
        if has_domain && self.seen.insert(candidate.address.clone()) {
            self.candidates.push(candidate);
        }
    }

    fn push_generated(&mut self, name: &PersonName, domain: &str, origin: CandidateOrigin) {
        let template = match origin {
            CandidateOrigin::Pattern(t) | CandidateOrigin::Fallback(t) => t,
            CandidateOrigin::Observed(_) => return,
        };
        if let Some(local) = template.local_part(&name.first, &name.last) {
            self.push(EmailCandidate::new(&format!("{local}@{domain}"), origin));
        }
    }
}

#[cfg(test)]
mod tests {
    use scout_core::SignalSource;

    use super::*;

    fn jane_doe() -> PersonName {
        PersonName {
            first: "jane".to_owned(),
            last: "doe".to_owned(),
        }
    }

    fn addresses(candidates: &[EmailCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.address.as_str()).collect()
    }

    #[test]
    fn unknown_pattern_yields_only_the_fallback_ladder() {
        let candidates = generate_candidates(&[], Some(&jane_doe()), Some("acme.com"), None, 10);
        assert_eq!(
            addresses(&candidates),
            vec!["jane.doe@acme.com", "janedoe@acme.com", "jane@acme.com", "j.doe@acme.com"]
        );
        assert!(candidates.iter().all(|c| c.rank == 2));
    }

    #[test]
    fn observed_then_pattern_then_ladder_without_duplicates() {
        let observed = ContactSignal::email("Jane.Doe@acme.com", SignalSource::SitePage, "site");
        let pattern = EmailPattern {
            template: PatternTemplate::InitialLast,
            domain: "acme.com".to_owned(),
            evidence: 2,
        };

        let candidates = generate_candidates(
            &[&observed],
            Some(&jane_doe()),
            Some("acme.com"),
            Some(&pattern),
            10,
        );

        assert_eq!(
            addresses(&candidates),
            vec![
                "jane.doe@acme.com",
                "jdoe@acme.com",
                "janedoe@acme.com",
                "jane@acme.com",
                "j.doe@acme.com"
            ]
        );
        assert_eq!(
            candidates[0].origin,
            CandidateOrigin::Observed(SignalSource::SitePage)
        );
        assert_eq!(candidates[1].rank, 1);
        let unique: HashSet<&str> = addresses(&candidates).into_iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn single_word_name_keeps_only_observed() {
        let observed = ContactSignal::email("hi@madonna.com", SignalSource::BioText, "bio");
        let candidates = generate_candidates(&[&observed], None, Some("madonna.com"), None, 10);
        assert_eq!(addresses(&candidates), vec!["hi@madonna.com"]);
    }

    #[test]
    fn pattern_for_another_domain_is_ignored() {
        let pattern = EmailPattern {
            template: PatternTemplate::FirstUnderscoreLast,
            domain: "gmail.com".to_owned(),
            evidence: 1,
        };
        let candidates =
            generate_candidates(&[], Some(&jane_doe()), Some("acme.com"), Some(&pattern), 10);
        assert!(candidates.iter().all(|c| c.rank == 2));
    }

    #[test]
    fn list_is_capped() {
        let candidates = generate_candidates(&[], Some(&jane_doe()), Some("acme.com"), None, 2);
        assert_eq!(
            addresses(&candidates),
            vec!["jane.doe@acme.com", "janedoe@acme.com"]
        );
    }

    #[test]
    fn cap_keeps_pattern_and_first_ladder_step_when_many_addresses_are_observed() {
        let locals = ["a.smith", "b.jones", "c.brown", "d.white", "e.green", "f.black"];
        let observed: Vec<ContactSignal> = locals
            .iter()
            .map(|local| {
                let address = format!("{local}@acme.com");
                ContactSignal::email(&address, SignalSource::SitePage, "site")
            })
            .collect();
        let observed: Vec<&ContactSignal> = observed.iter().collect();
        let pattern = EmailPattern {
            template: PatternTemplate::InitialDotLast,
            domain: "acme.com".to_owned(),
            evidence: 6,
        };

        let candidates = generate_candidates(
            &observed,
            Some(&jane_doe()),
            Some("acme.com"),
            Some(&pattern),
            6,
        );

        assert_eq!(
            addresses(&candidates),
            vec![
                "a.smith@acme.com",
                "b.jones@acme.com",
                "c.brown@acme.com",
                "d.white@acme.com",
                "j.doe@acme.com",
                "jane.doe@acme.com"
            ]
        );
        assert_eq!(candidates[4].rank, 1);
    }

    #[test]
    fn observed_address_matching_the_pattern_is_not_reserved_twice() {
        let observed = ContactSignal::email("j.doe@acme.com", SignalSource::BioText, "bio");
        let pattern = EmailPattern {
            template: PatternTemplate::InitialDotLast,
            domain: "acme.com".to_owned(),
            evidence: 1,
        };

        let candidates = generate_candidates(
            &[&observed],
            Some(&jane_doe()),
            Some("acme.com"),
            Some(&pattern),
            2,
        );

        assert_eq!(addresses(&candidates), vec!["j.doe@acme.com", "jane.doe@acme.com"]);
        assert_eq!(candidates[0].rank, 0);
    }

    #[test]
    fn no_domain_and_no_observed_means_no_candidates() {
        assert!(generate_candidates(&[], Some(&jane_doe()), None, None, 10).is_empty());
    }
}
