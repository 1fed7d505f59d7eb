//! Lead enrichment pipeline.
//!
//! Turns scraped [`LeadProfile`](scout_core::LeadProfile)s into scored
//! [`EnrichedLead`](scout_core::EnrichedLead)s: text signal extraction,
//! company domain resolution, site harvesting, email pattern detection,
//! candidate generation, SMTP verification and confidence scoring. All
//! network access goes through a [`Gateway`](scout_gateway::Gateway).

pub mod cache;
pub mod candidates;
pub mod domain;
pub mod error;
pub mod extract;
pub mod finder;
pub mod harvest;
pub mod pattern;
pub mod pipeline;
pub mod resolver;
pub mod score;
pub mod signals;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::EnrichError;
pub use pipeline::{connect, EnrichSettings, Enricher};
