//! Per-lead contact signal store.

use std::collections::HashSet;

use scout_core::{ContactKind, ContactSignal, SignalSource};

/// Contact signals for one lead, unique by kind and normalized value.
///
/// The first sighting of an address wins; later sightings from other pages
/// or sources are dropped.
#[derive(Debug, Default, Clone)]
pub struct SignalSet {
    signals: Vec<ContactSignal>,
    seen: HashSet<(ContactKind, String)>,
}

impl SignalSet {
    /// Adds `signal` unless an equivalent one is already present.
    pub fn push(&mut self, signal: ContactSignal) -> bool {
        let key = (signal.kind, signal.normalized());
        if key.1.is_empty() || !self.seen.insert(key) {
            return false;
        }
        self.signals.push(signal);
        true
    }

    pub fn extend(&mut self, signals: impl IntoIterator<Item = ContactSignal>) -> usize {
        signals
            .into_iter()
            .map(|signal| self.push(signal))
            .filter(|added| *added)
            .count()
    }

    pub fn emails(&self) -> impl Iterator<Item = &ContactSignal> {
        self.signals
            .iter()
            .filter(|s| s.kind == ContactKind::Email)
    }

    pub fn has_email(&self) -> bool {
        self.emails().next().is_some()
    }

    /// Observed email signals ordered by how directly they tie to the lead:
    /// profile, bio, email finder, then site pages.
    pub fn observed_emails(&self) -> Vec<&ContactSignal> {
        let mut observed: Vec<&ContactSignal> = self
            .emails()
            .filter(|s| s.source.is_observed())
            .collect();
        observed.sort_by_key(|s| source_priority(s.source));
        observed
    }

    pub fn first_phone(&self) -> Option<&ContactSignal> {
        self.signals.iter().find(|s| s.kind == ContactKind::Phone)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn into_vec(self) -> Vec<ContactSignal> {
        self.signals
    }
}

fn source_priority(source: SignalSource) -> u8 {
    match source {
        SignalSource::Profile => 0,
        SignalSource::BioText => 1,
        SignalSource::EmailFinder => 2,
        SignalSource::SitePage => 3,
        SignalSource::GeneratedVerified => 4,
    }
}
