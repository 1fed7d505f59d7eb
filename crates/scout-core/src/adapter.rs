//! The capability every platform scraper provides.
//!
//! Scrapers live outside this workspace; enrichment only ever sees the
//! [`LeadProfile`] they produce.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::LeadProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Linkedin,
    Github,
    Youtube,
    Twitch,
    /// Link-in-bio pages (Linktree, Stan, Linkr, Bio.link).
    Linkbio,
    Pinterest,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Linkedin => "linkedin",
            Platform::Github => "github",
            Platform::Youtube => "youtube",
            Platform::Twitch => "twitch",
            Platform::Linkbio => "linkbio",
            Platform::Pinterest => "pinterest",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("profile {handle} not found on {platform}")]
    NotFound { platform: Platform, handle: String },

    #[error("{platform} blocked the request: {reason}")]
    Blocked { platform: Platform, reason: String },

    #[error("{platform} returned an unexpected page shape: {reason}")]
    Parse { platform: Platform, reason: String },
}

/// One implementation per platform; produces a normalized profile for a handle.
#[async_trait]
pub trait ScraperAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn scrape(&self, handle: &str) -> Result<LeadProfile, ScrapeError>;
}
