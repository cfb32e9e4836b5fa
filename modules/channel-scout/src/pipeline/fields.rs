//! Profile field extraction from a channel's About page.
//!
//! Every field is read independently with a bounded wait. A field that does
//! not render in time, or whose query fails, becomes `SENTINEL`; it never
//! affects the other fields.

use std::time::Duration;

use tracing::debug;

use super::record::SENTINEL;
use crate::traits::{AgentResult, RenderingAgent};

pub const LOCATION_QUERY: &str =
    r#"//*[@id="additional-info-container"]/table/tbody/tr[4]/td[2]"#;
pub const JOIN_DATE_QUERY: &str = r#"//*[@id="additional-info-container"]/table/tbody/tr[5]/td[2]/yt-attributed-string/span/span"#;
pub const SUBSCRIBERS_QUERY: &str =
    r#"//*[@id="additional-info-container"]/table/tbody/tr[6]/td[2]"#;
pub const VIDEOS_QUERY: &str =
    r#"//*[@id="additional-info-container"]/table/tbody/tr[7]/td[2]"#;
pub const VIEWS_QUERY: &str =
    r#"//*[@id="additional-info-container"]/table/tbody/tr[8]/td[2]"#;
pub const DESCRIPTION_QUERY: &str = r#"//*[@id="description-container"]/span"#;

/// Every anchor whose target is an absolute http(s) URL.
pub const OUTBOUND_LINK_QUERY: &str = r#"//a[contains(@href, "http")]"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub location: String,
    pub description: String,
    pub join_date: String,
    pub subscribers: String,
    pub videos: String,
    pub views: String,
}

/// Trimmed text of the first element matching `query`, or `SENTINEL`.
pub async fn extract_field(agent: &dyn RenderingAgent, query: &str, timeout: Duration) -> String {
    let element = match agent.wait_for_first(query, timeout).await {
        Ok(element) => element,
        Err(e) => {
            debug!(query, error = %e, "Field unavailable");
            return SENTINEL.to_string();
        }
    };

    match agent.text(&element).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!(query, error = %e, "Field text unreadable");
            SENTINEL.to_string()
        }
    }
}

pub async fn extract_all_fields(agent: &dyn RenderingAgent, timeout: Duration) -> ProfileFields {
    ProfileFields {
        location: extract_field(agent, LOCATION_QUERY, timeout).await,
        join_date: extract_field(agent, JOIN_DATE_QUERY, timeout).await,
        subscribers: extract_field(agent, SUBSCRIBERS_QUERY, timeout).await,
        videos: extract_field(agent, VIDEOS_QUERY, timeout).await,
        views: extract_field(agent, VIEWS_QUERY, timeout).await,
        description: extract_field(agent, DESCRIPTION_QUERY, timeout).await,
    }
}

/// `href` of every outbound anchor on the page. Empty or missing hrefs are
/// skipped, as are anchors that went stale between query and read.
pub async fn extract_outbound_links(agent: &dyn RenderingAgent) -> AgentResult<Vec<String>> {
    let anchors = agent.find_all(OUTBOUND_LINK_QUERY).await?;

    let mut links = Vec::with_capacity(anchors.len());
    for anchor in &anchors {
        match agent.attribute(anchor, "href").await {
            Ok(Some(href)) if !href.is_empty() => links.push(href),
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!(error = %e, "Skipping unreadable anchor"),
        }
    }
    Ok(links)
}
