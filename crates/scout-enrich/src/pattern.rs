//! Email pattern detection from known addresses on a domain.
//!
//! An address supports a template when its local part is exactly that
//! template rendered with the lead's name, or, for addresses that belong to
//! someone else, when its shape only fits that template (`a.smith` is
//! `f.last`, `john_smith` is `first_last`). The template with the most
//! supporting addresses wins; equal counts go to the more specific template,
//! then to the earlier entry of [`PatternTemplate::ALL`].

use std::collections::HashSet;

use scout_core::{EmailPattern, PatternTemplate};

use crate::extract::PersonName;

/// Shared mailboxes that say nothing about how personal addresses look.
const ROLE_ACCOUNTS: &[&str] = &[
    "info",
    "contact",
    "hello",
    "hi",
    "support",
    "sales",
    "admin",
    "team",
    "office",
    "press",
    "mail",
    "careers",
    "jobs",
    "billing",
    "help",
    "marketing",
    "media",
    "partnerships",
    "booking",
    "bookings",
    "enquiries",
    "inquiries",
];

/// Detects the local-part convention on `domain` from `known_emails`.
///
/// Addresses on other domains and role accounts are ignored. Returns `None`
/// when no address supports any template.
#[must_use]
pub fn detect_pattern<'a>(
    domain: &str,
    known_emails: impl IntoIterator<Item = &'a str>,
    name: Option<&PersonName>,
) -> Option<EmailPattern> {
    let domain = domain.to_ascii_lowercase();
    let mut counts = [0usize; PatternTemplate::ALL.len()];

    for email in known_emails {
        let email = email.trim().to_lowercase();
        let Some((local, email_domain)) = email.rsplit_once('@') else {
            continue;
        };
        if email_domain != domain || ROLE_ACCOUNTS.contains(&local) {
            continue;
        }
        for template in supported_templates(local, name) {
            if let Some(i) = PatternTemplate::ALL.iter().position(|t| *t == template) {
                counts[i] += 1;
            }
        }
    }

    let (index, evidence) = counts
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(i, count)| {
            (
                *count,
                PatternTemplate::ALL[*i].specificity(),
                std::cmp::Reverse(*i),
            )
        })?;

    let template = PatternTemplate::ALL[index];
    tracing::debug!(%domain, %template, evidence, "email pattern detected");
    Some(EmailPattern {
        template,
        domain,
        evidence,
    })
}

/// Templates a single local part supports, each at most once.
fn supported_templates(local: &str, name: Option<&PersonName>) -> HashSet<PatternTemplate> {
    let mut supported = HashSet::new();
    if let Some(name) = name {
        supported.extend(
            PatternTemplate::ALL
                .into_iter()
                .filter(|t| t.local_part(&name.first, &name.last).as_deref() == Some(local)),
        );
    }
    if let Some(template) = classify_shape(local) {
        supported.insert(template);
    }
    supported
}

/// The only template a separator-bearing local part can have come from.
fn classify_shape(local: &str) -> Option<PatternTemplate> {
    let is_token = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic());

    if let Some((left, right)) = local.split_once('.') {
        if !is_token(left) || !is_token(right) {
            return None;
        }
        let template = match (left.len(), right.len()) {
            (1, 1) => return None,
            (1, _) => PatternTemplate::InitialDotLast,
            (_, 1) => PatternTemplate::FirstDotInitial,
            _ => PatternTemplate::FirstDotLast,
        };
        return Some(template);
    }
    if let Some((left, right)) = local.split_once('_') {
        if is_token(left) && is_token(right) && left.len() > 1 && right.len() > 1 {
            return Some(PatternTemplate::FirstUnderscoreLast);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane_doe() -> PersonName {
        PersonName {
            first: "jane".to_owned(),
            last: "doe".to_owned(),
        }
    }

    #[test]
    fn equal_evidence_goes_to_the_more_specific_template() {
        let pattern = detect_pattern(
            "acme.com",
            ["jane.doe@acme.com", "jane@acme.com"],
            Some(&jane_doe()),
        )
        .unwrap();

        assert_eq!(pattern.template, PatternTemplate::FirstDotLast);
        assert_eq!(pattern.domain, "acme.com");
        assert_eq!(pattern.evidence, 1);
    }

    #[test]
    fn higher_match_count_beats_specificity() {
        let pattern = detect_pattern(
            "acme.com",
            ["j.smith@acme.com", "a.jones@acme.com", "jane.doe@acme.com"],
            Some(&jane_doe()),
        )
        .unwrap();

        assert_eq!(pattern.template, PatternTemplate::InitialDotLast);
        assert_eq!(pattern.evidence, 2);
    }

    #[test]
    fn colleague_addresses_count_by_shape() {
        let pattern = detect_pattern("acme.com", ["john_smith@acme.com"], None).unwrap();
        assert_eq!(pattern.template, PatternTemplate::FirstUnderscoreLast);

        let pattern = detect_pattern("acme.com", ["mary.k@acme.com"], None).unwrap();
        assert_eq!(pattern.template, PatternTemplate::FirstDotInitial);
    }

    #[test]
    fn name_match_identifies_unseparated_templates() {
        let pattern = detect_pattern("acme.com", ["JDoe@Acme.com"], Some(&jane_doe())).unwrap();
        assert_eq!(pattern.template, PatternTemplate::InitialLast);
    }

    #[test]
    fn role_accounts_and_other_domains_are_not_evidence() {
        let pattern = detect_pattern(
            "acme.com",
            ["info@acme.com", "hello@acme.com", "jane.doe@gmail.com"],
            Some(&jane_doe()),
        );
        assert!(pattern.is_none());
    }

    #[test]
    fn unrecognizable_local_parts_leave_pattern_unknown() {
        assert!(detect_pattern("acme.com", ["xq7@acme.com", "a.b@acme.com"], None).is_none());
        assert!(detect_pattern("acme.com", std::iter::empty(), Some(&jane_doe())).is_none());
    }
}
