//! Link classification: map outbound profile links to social platforms.
//!
//! Channels list their other accounts on the profile page, often behind a
//! `youtube.com/redirect?q=<target>` wrapper. Wrappers are unwrapped first,
//! then the target is matched against an ordered substring taxonomy.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Substring marking a redirect wrapper; the real target is in `q`.
const REDIRECT_MARKER: &str = "youtube.com/redirect";
const REDIRECT_TARGET_PARAM: &str = "q";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    TikTok,
    Snapchat,
    Instagram,
    Discord,
    Twitter,
    YouTube,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::TikTok => "TikTok",
            Platform::Snapchat => "Snapchat",
            Platform::Instagram => "Instagram",
            Platform::Discord => "Discord",
            Platform::Twitter => "Twitter",
            Platform::YouTube => "YouTube",
        }
    }
}

// Ordered by label so serialized link lists sort alphabetically by platform.
impl Ord for Platform {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label().cmp(other.label())
    }
}

impl PartialOrd for Platform {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// First matching substring wins, so order is significant.
pub const PLATFORM_TAXONOMY: &[(&str, Platform)] = &[
    ("tiktok.com", Platform::TikTok),
    ("snapchat.com", Platform::Snapchat),
    ("instagram.com", Platform::Instagram),
    ("discord.gg", Platform::Discord),
    ("discord.com", Platform::Discord),
    ("twitter.com", Platform::Twitter),
    ("youtube.com/@", Platform::YouTube),
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassifiedLink {
    pub platform: Platform,
    pub url: String,
}

/// Unwrap a redirect wrapper to its decoded target. Non-wrapper URLs pass
/// through unchanged; a wrapper with no usable target yields `None`.
pub fn resolve_redirect(url: &str) -> Option<String> {
    if !url.contains(REDIRECT_MARKER) {
        return Some(url.to_string());
    }

    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == REDIRECT_TARGET_PARAM)
        .map(|(_, target)| target.into_owned())
        .filter(|target| !target.is_empty())
}

/// Match an already-resolved URL against the taxonomy.
pub fn classify(url: &str) -> Option<ClassifiedLink> {
    PLATFORM_TAXONOMY
        .iter()
        .find(|(needle, _)| url.contains(needle))
        .map(|(_, platform)| ClassifiedLink {
            platform: *platform,
            url: url.to_string(),
        })
}

/// Distinct classified links, kept in (platform label, url) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet(BTreeSet<ClassifiedLink>);

impl LinkSet {
    /// Resolve and classify every raw link, dropping unclassified ones.
    pub fn from_raw<S: AsRef<str>>(raw_links: &[S]) -> Self {
        let mut set = Self::default();
        for raw in raw_links {
            let Some(target) = resolve_redirect(raw.as_ref()) else {
                continue;
            };
            if let Some(link) = classify(&target) {
                set.insert(link);
            }
        }
        set
    }

    pub fn insert(&mut self, link: ClassifiedLink) -> bool {
        self.0.insert(link)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Platform: url` lines joined by `\n`.
    pub fn serialize(&self) -> String {
        self.0
            .iter()
            .map(|link| format!("{}: {}", link.platform, link.url))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
