//! The unit persisted to the catalog, and its wire shape.

use serde_json::Value;

use airtable_client::Fields;

use super::classifier::LinkSet;
use super::fields::ProfileFields;

/// Placeholder for any value that could not be read from the page.
pub const SENTINEL: &str = "N/A";

// Catalog column names.
pub const CHANNEL_NAME_FIELD: &str = "Channel Name";
const LOCATION_FIELD: &str = "Location";
const DESCRIPTION_FIELD: &str = "Description";
const JOIN_DATE_FIELD: &str = "Joining Date";
const SUBSCRIBERS_FIELD: &str = "Subscribers";
const VIDEOS_FIELD: &str = "Videos";
const VIEWS_FIELD: &str = "Views";
const LINKS_FIELD: &str = "Links";
const TOPIC_FIELD: &str = "Search";

/// A newly discovered channel. Built once per unique visit, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub channel_name: String,
    pub location: String,
    pub description: String,
    pub join_date: String,
    pub subscribers: String,
    pub videos: String,
    pub views: String,
    /// Newline-joined `Platform: url` pairs, sorted.
    pub links: String,
    pub topic: String,
}

impl ProfileRecord {
    pub fn new(channel_name: &str, fields: ProfileFields, links: &LinkSet, topic: &str) -> Self {
        Self {
            channel_name: channel_name.to_string(),
            location: fields.location,
            description: fields.description,
            join_date: fields.join_date,
            subscribers: fields.subscribers,
            videos: fields.videos,
            views: fields.views,
            links: links.serialize(),
            topic: topic.to_string(),
        }
    }

    /// Catalog field map for this record.
    pub fn to_fields(&self) -> Fields {
        [
            (CHANNEL_NAME_FIELD, &self.channel_name),
            (LOCATION_FIELD, &self.location),
            (DESCRIPTION_FIELD, &self.description),
            (JOIN_DATE_FIELD, &self.join_date),
            (SUBSCRIBERS_FIELD, &self.subscribers),
            (VIDEOS_FIELD, &self.videos),
            (VIEWS_FIELD, &self.views),
            (LINKS_FIELD, &self.links),
            (TOPIC_FIELD, &self.topic),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.clone())))
        .collect()
    }
}

/// Identity used for catalog dedup: the last path segment of the channel URL.
pub fn channel_name(channel_url: &str) -> String {
    match channel_url.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => SENTINEL.to_string(),
    }
}
