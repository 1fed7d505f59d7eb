//! Text signal extraction: emails, phones, company hints and bio links.
//!
//! Everything here is a pure function over strings. Matching is driven by
//! static rule tables so each rule can be exercised on its own.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scout_core::{CompanyHint, ContactSignal, LeadProfile, SignalSource};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid regex")
});
static TEL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']tel:([+\d\s\-().]+)"#).expect("valid regex")
});
static WHATSAPP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:wa\.me/|api\.whatsapp\.com/send/?\?phone=)\+?(\d{6,})")
        .expect("valid regex")
});
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Visible-text phone shapes, tried in order.
static PHONE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\+1[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\+\d{1,3}[-.\s]\(?\d{2,4}\)?[-.\s]?\d{3,4}[-.\s]?\d{3,4}",
        r"\(\d{3}\)[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\b\d{3}[-.]\d{3}[-.]\d{4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid phone regex"))
    .collect()
});

static BIO_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"https?://[^\s<>"{}|\\^`\[\]]+|(?i:linktr\.ee|stan\.store|beacons\.ai|linkr\.bio|bio\.link)/[^\s<>"{}|\\^`\[\]]+"#,
    )
    .expect("valid regex")
});

const EMAIL_DOMAIN_BLOCKLIST: &[&str] = &[
    "example.com",
    "test.com",
    "email.com",
    "youremail.com",
    "sentry.io",
    "wixpress.com",
    "googleapis.com",
    "w3.org",
    "schema.org",
    "gravatar.com",
    "wordpress.com",
];

pub(crate) const ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".gif", ".css", ".js", ".svg", ".webp", ".ico",
];

const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "llc",
    "ltd",
    "co",
    "corp",
    "corporation",
    "company",
    "limited",
    "gmbh",
    "plc",
    "group",
    "holdings",
];

const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "prof"];

/// Bio links beyond this count are ignored.
pub const MAX_BIO_LINKS: usize = 3;

const MAX_COMPANY_WORDS: usize = 5;

/// One company-hint rule: a pattern with a `company` capture group.
struct CompanyRule {
    name: &'static str,
    pattern: Regex,
    /// Generic phrasing is only trusted in headlines, where it is almost
    /// always "<role> at <employer>".
    headline_only: bool,
}

const ROLES: &str = r"ceo|cto|coo|cfo|cmo|cpo|co-?founder|founder|owner|director|president|partner|principal|manager|engineer|designer|consultant|head of [a-z]+|vp(?: of [a-z]+)?";
const COMPANY_TAIL: &str = r"(?P<company>[^|,;!?()\n@]+?)\s*(?:[|,;!?()\n]|\s[-–—]\s|\.(?:\s|$)|$)";

static COMPANY_RULES: LazyLock<Vec<CompanyRule>> = LazyLock::new(|| {
    let rule = |name, pattern: String, headline_only| CompanyRule {
        name,
        pattern: Regex::new(&pattern).expect("valid company rule"),
        headline_only,
    };
    vec![
        rule(
            "role-preposition",
            format!(r"(?i)\b(?:{ROLES})\s+(?:of|at|@)\s+{COMPANY_TAIL}"),
            false,
        ),
        rule(
            "role-comma",
            format!(r"(?i)\b(?:{ROLES})\s*,\s*{COMPANY_TAIL}"),
            false,
        ),
        rule(
            "at-company",
            format!(r"(?i)(?:^|\s)(?:at|@)\s+{COMPANY_TAIL}"),
            true,
        ),
    ]
});

/// Output of [`extract_text_signals`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextSignals {
    pub signals: Vec<ContactSignal>,
    pub company: Option<CompanyHint>,
}

/// Lowercase name tokens used to render email local parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

/// Pulls contact signals and a company hint out of a profile's bio and headline.
#[must_use]
pub fn extract_text_signals(profile: &LeadProfile) -> TextSignals {
    let mut signals = Vec::new();
    for (field, text) in [("bio", &profile.bio), ("headline", &profile.headline)] {
        signals.extend(
            extract_emails(text)
                .iter()
                .map(|e| ContactSignal::email(e, SignalSource::BioText, field)),
        );
        signals.extend(
            extract_phones(text)
                .iter()
                .map(|p| ContactSignal::phone(p, SignalSource::BioText, field)),
        );
    }

    let company = company_hint(&profile.headline, true).or_else(|| company_hint(&profile.bio, false));

    TextSignals { signals, company }
}

/// Email addresses in `text`, lowercased, filtered and de-duplicated in order of appearance.
#[must_use]
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.').to_lowercase())
        .filter(|e| is_acceptable_email(e))
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

/// Rejects placeholder domains, tracking/CDN domains and asset filenames
/// that merely look like addresses (`logo@2x.png`).
#[must_use]
pub fn is_acceptable_email(email: &str) -> bool {
    let lower = email.to_lowercase();
    let Some((local, domain)) = lower.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if EMAIL_DOMAIN_BLOCKLIST
        .iter()
        .any(|blocked| domain == *blocked || domain.ends_with(&format!(".{blocked}")))
    {
        return false;
    }
    !ASSET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Phone numbers from `tel:` links, WhatsApp links and visible text.
///
/// Only values with 10 to 15 digits are kept.
#[must_use]
pub fn extract_phones(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones = Vec::new();
    let mut keep = |raw: &str, phones: &mut Vec<String>| {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if (10..=15).contains(&digits.len()) && seen.insert(digits) {
            phones.push(raw.trim().to_owned());
        }
    };

    for caps in TEL_LINK_RE.captures_iter(text) {
        keep(&caps[1], &mut phones);
    }
    for caps in WHATSAPP_RE.captures_iter(text) {
        keep(&format!("+{}", &caps[1]), &mut phones);
    }

    let visible = visible_text(text);
    for rule in PHONE_RULES.iter() {
        for m in rule.find_iter(&visible) {
            keep(m.as_str(), &mut phones);
        }
    }
    phones
}

/// Strips scripts, styles and tags, collapsing whitespace.
fn visible_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_tags = TAG_RE.replace_all(&without_styles, " ");
    WHITESPACE_RE.replace_all(&without_tags, " ").into_owned()
}

/// Applies the company rule table to `text`; first matching rule wins.
#[must_use]
pub fn company_hint(text: &str, is_headline: bool) -> Option<CompanyHint> {
    COMPANY_RULES
        .iter()
        .filter(|rule| is_headline || !rule.headline_only)
        .find_map(|rule| {
            let caps = rule.pattern.captures(text)?;
            let hint = build_hint(caps.name("company")?.as_str())?;
            tracing::trace!(rule = rule.name, company = %hint.display, "company hint matched");
            Some(hint)
        })
}

fn build_hint(raw: &str) -> Option<CompanyHint> {
    let display = raw.trim().trim_end_matches('.').trim().to_owned();
    if display.split_whitespace().count() > MAX_COMPANY_WORDS {
        return None;
    }
    let normalized = normalize_company(&display);
    if normalized.replace(' ', "").len() <= 2 {
        return None;
    }
    Some(CompanyHint {
        display,
        normalized,
    })
}

/// Lowercases, drops punctuation and trailing legal suffixes, and collapses whitespace.
#[must_use]
pub fn normalize_company(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| LEGAL_SUFFIXES.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

/// Links in a bio: full URLs plus bare aggregator paths such as `linktr.ee/jane`.
///
/// Bare paths get an `https://` scheme; trailing punctuation is trimmed.
#[must_use]
pub fn extract_bio_links(bio: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    BIO_LINK_RE
        .find_iter(bio)
        .map(|m| {
            let link = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
            if link.starts_with("http") {
                link.to_owned()
            } else {
                format!("https://{link}")
            }
        })
        .filter(|link| seen.insert(link.clone()))
        .take(MAX_BIO_LINKS)
        .collect()
}

/// First and last name tokens from a display name.
///
/// Text after a separator (`|`, `•`, `,`, `(`, `/`) is ignored, honorifics
/// are skipped and tokens keep ASCII letters only. A single remaining token
/// yields `None`.
#[must_use]
pub fn person_name(display_name: &str) -> Option<PersonName> {
    let head = display_name
        .split(['|', '•', '·', ',', '(', '/'])
        .next()
        .unwrap_or_default();
    let tokens: Vec<String> = head
        .split_whitespace()
        .map(|t| {
            t.chars()
                .filter(char::is_ascii_alphabetic)
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .skip_while(|t| HONORIFICS.contains(&t.as_str()))
        .collect();
    match tokens.as_slice() {
        [first, .., last] => Some(PersonName {
            first: first.clone(),
            last: last.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
