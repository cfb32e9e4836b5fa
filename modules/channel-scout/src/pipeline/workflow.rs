//! Per-video extraction: video page -> channel -> About page -> record.
//!
//! Two dedup gates: `visited` (channel URLs seen this run, shared across
//! topics) and `known` (channel names already in the catalog when the run
//! started). Failures are contained per video unless the agent is gone.

use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use super::classifier::LinkSet;
use super::fields::{extract_all_fields, extract_outbound_links};
use super::record::{channel_name, ProfileRecord};
use super::stats::ScoutStats;
use crate::config::ExtractionConfig;
use crate::traits::{is_fatal, RenderingAgent};

/// Channel link under the video's title.
pub const CHANNEL_ANCHOR_QUERY: &str = "//ytd-channel-name//a";

pub const SCROLL_PROFILE: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Page text shown instead of a profile for removed or blocked channels.
pub const UNAVAILABLE_MARKERS: &[&str] = &[
    "This channel is not available",
    "This page isn't available",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Extracted(ProfileRecord),
    AlreadyVisited,
    Unavailable,
    AlreadyInCatalog(String),
}

/// Records gathered for one topic. `fatal` is set when the agent died
/// mid-topic; `records` still holds everything extracted before that.
#[derive(Debug, Default)]
pub struct TopicExtraction {
    pub records: Vec<ProfileRecord>,
    pub fatal: Option<anyhow::Error>,
}

pub struct ExtractionWorkflow<'a> {
    agent: &'a dyn RenderingAgent,
    config: &'a ExtractionConfig,
    known: &'a HashSet<String>,
    visited: HashSet<String>,
}

impl<'a> ExtractionWorkflow<'a> {
    pub fn new(
        agent: &'a dyn RenderingAgent,
        config: &'a ExtractionConfig,
        known: &'a HashSet<String>,
    ) -> Self {
        Self {
            agent,
            config,
            known,
            visited: HashSet::new(),
        }
    }

    /// Channel URLs visited so far this run.
    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Process every video of a topic in discovery order.
    pub async fn process_topic(
        &mut self,
        topic: &str,
        video_links: &[String],
        stats: &mut ScoutStats,
    ) -> TopicExtraction {
        let mut extraction = TopicExtraction::default();

        for (idx, video_url) in video_links.iter().enumerate() {
            info!(item = idx + 1, total = video_links.len(), url = %video_url, "Opening video");
            stats.items_visited += 1;

            match self.process_item(topic, video_url).await {
                Ok(ItemOutcome::Extracted(record)) => {
                    info!(
                        channel = %record.channel_name,
                        description_chars = record.description.chars().count(),
                        "Scraped channel"
                    );
                    stats.records_extracted += 1;
                    extraction.records.push(record);
                }
                Ok(ItemOutcome::AlreadyVisited) => {
                    info!("Skipping already visited channel");
                    stats.skipped_visited += 1;
                }
                Ok(ItemOutcome::Unavailable) => {
                    info!("Channel page not available, skipping");
                    stats.skipped_unavailable += 1;
                }
                Ok(ItemOutcome::AlreadyInCatalog(name)) => {
                    info!(channel = %name, "Skipping channel already in catalog");
                    stats.skipped_in_catalog += 1;
                }
                Err(e) if is_fatal(&e) => {
                    warn!(url = %video_url, error = %e, "Rendering agent lost, ending topic");
                    stats.items_failed += 1;
                    extraction.fatal = Some(e);
                    break;
                }
                Err(e) => {
                    warn!(url = %video_url, error = format!("{e:#}"), "Error processing video");
                    stats.items_failed += 1;
                }
            }
        }

        extraction
    }

    /// Visit one video and, if its channel is new, extract a record.
    pub async fn process_item(&mut self, topic: &str, video_url: &str) -> Result<ItemOutcome> {
        let agent = self.agent;

        agent
            .navigate(video_url)
            .await
            .context("Failed to open video")?;
        tokio::time::sleep(self.config.settle_delay()).await;

        let anchor = agent
            .wait_for_first(CHANNEL_ANCHOR_QUERY, self.config.field_timeout())
            .await
            .context("Channel link not found")?;
        let channel_url = agent
            .attribute(&anchor, "href")
            .await?
            .filter(|href| !href.is_empty())
            .ok_or_else(|| anyhow!("Channel link has no href"))?;

        if !self.visited.insert(channel_url.clone()) {
            return Ok(ItemOutcome::AlreadyVisited);
        }

        let about_url = format!("{}/about", channel_url.trim_end_matches('/'));
        info!(url = %about_url, "Visiting channel About page");
        agent
            .navigate(&about_url)
            .await
            .context("Failed to open channel About page")?;
        tokio::time::sleep(self.config.settle_delay()).await;

        let source = agent.page_source().await?;
        if UNAVAILABLE_MARKERS.iter().any(|m| source.contains(m)) {
            return Ok(ItemOutcome::Unavailable);
        }

        agent.execute_script(SCROLL_PROFILE).await?;
        tokio::time::sleep(self.config.scroll_settle()).await;

        let fields = extract_all_fields(agent, self.config.field_timeout()).await;
        let raw_links = extract_outbound_links(agent).await?;
        let links = LinkSet::from_raw(&raw_links);

        let name = channel_name(&channel_url);
        if self.known.contains(&name) {
            return Ok(ItemOutcome::AlreadyInCatalog(name));
        }
        if links.is_empty() {
            debug!(channel = %name, "No social links on profile");
        } else {
            debug!(channel = %name, links = links.len(), "Classified social links");
        }

        Ok(ItemOutcome::Extracted(ProfileRecord::new(
            &name, fields, &links, topic,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fields::{LOCATION_QUERY, OUTBOUND_LINK_QUERY};
    use crate::pipeline::record::SENTINEL;
    use crate::testing::{fast_config, MockAgent, MockElement};

    const VIDEO_A: &str = "https://www.youtube.com/watch?v=a";
    const VIDEO_B: &str = "https://www.youtube.com/watch?v=b";
    const CHANNEL: &str = "https://www.youtube.com/@frugalfox";
    const ABOUT: &str = "https://www.youtube.com/@frugalfox/about";

    fn agent_with_channel() -> MockAgent {
        MockAgent::new()
            .on_elements(VIDEO_A, CHANNEL_ANCHOR_QUERY, vec![MockElement::link(CHANNEL)])
            .on_elements(VIDEO_B, CHANNEL_ANCHOR_QUERY, vec![MockElement::link(CHANNEL)])
            .on_elements(ABOUT, LOCATION_QUERY, vec![MockElement::text("Ireland")])
            .on_elements(
                ABOUT,
                OUTBOUND_LINK_QUERY,
                vec![
                    MockElement::link("https://www.youtube.com/redirect?q=https%3A%2F%2Ftiktok.com%2F%40frugalfox"),
                    MockElement::link("https://instagram.com/frugalfox"),
                ],
            )
    }

    #[tokio::test]
    async fn builds_record_from_about_page() {
        let config = fast_config();
        let agent = agent_with_channel();
        let known = HashSet::new();
        let mut workflow = ExtractionWorkflow::new(&agent, &config.extraction, &known);

        let outcome = workflow.process_item("budgeting", VIDEO_A).await.unwrap();
        let ItemOutcome::Extracted(record) = outcome else {
            panic!("expected a record, got {outcome:?}");
        };

        assert_eq!(record.channel_name, "@frugalfox");
        assert_eq!(record.location, "Ireland");
        assert_eq!(record.views, SENTINEL);
        assert_eq!(
            record.links,
            "Instagram: https://instagram.com/frugalfox\nTikTok: https://tiktok.com/@frugalfox"
        );
        assert_eq!(record.topic, "budgeting");
        assert_eq!(agent.navigations(), vec![VIDEO_A, ABOUT]);
    }

    #[tokio::test]
    async fn same_channel_yields_one_record() {
        let config = fast_config();
        let agent = agent_with_channel();
        let known = HashSet::new();
        let mut workflow = ExtractionWorkflow::new(&agent, &config.extraction, &known);
        let mut stats = ScoutStats::default();

        let extraction = workflow
            .process_topic(
                "budgeting",
                &[VIDEO_A.to_string(), VIDEO_B.to_string()],
                &mut stats,
            )
            .await;

        assert_eq!(extraction.records.len(), 1);
        assert!(extraction.fatal.is_none());
        assert_eq!(stats.skipped_visited, 1);
        // The second video never reaches the About page.
        assert_eq!(agent.navigations(), vec![VIDEO_A, ABOUT, VIDEO_B]);
    }

    #[tokio::test]
    async fn catalog_known_channel_is_skipped() {
        let config = fast_config();
        let agent = agent_with_channel();
        let known: HashSet<String> = ["@frugalfox".to_string()].into_iter().collect();
        let mut workflow = ExtractionWorkflow::new(&agent, &config.extraction, &known);

        let outcome = workflow.process_item("budgeting", VIDEO_A).await.unwrap();
        assert_eq!(outcome, ItemOutcome::AlreadyInCatalog("@frugalfox".to_string()));
        assert!(workflow.visited().contains(CHANNEL));
    }

    #[tokio::test]
    async fn unavailable_channel_is_skipped() {
        let config = fast_config();
        let agent = agent_with_channel()
            .on_page(ABOUT, "<html><body>This channel is not available.</body></html>");
        let known = HashSet::new();
        let mut workflow = ExtractionWorkflow::new(&agent, &config.extraction, &known);

        let outcome = workflow.process_item("budgeting", VIDEO_A).await.unwrap();
        assert_eq!(outcome, ItemOutcome::Unavailable);
        assert!(agent.scripts_run().is_empty());
    }

    #[tokio::test]
    async fn missing_channel_link_skips_item_and_continues() {
        let config = fast_config();
        let agent = agent_with_channel().on_page("https://www.youtube.com/watch?v=broken", "");
        let known = HashSet::new();
        let mut workflow = ExtractionWorkflow::new(&agent, &config.extraction, &known);
        let mut stats = ScoutStats::default();

        let extraction = workflow
            .process_topic(
                "budgeting",
                &[
                    "https://www.youtube.com/watch?v=broken".to_string(),
                    VIDEO_A.to_string(),
                ],
                &mut stats,
            )
            .await;

        assert_eq!(stats.items_failed, 1);
        assert_eq!(extraction.records.len(), 1);
        assert!(extraction.fatal.is_none());
    }

    #[tokio::test]
    async fn disconnect_ends_topic_but_keeps_records() {
        let config = fast_config();
        let agent = agent_with_channel().disconnect_on("https://www.youtube.com/watch?v=dead");
        let known = HashSet::new();
        let mut workflow = ExtractionWorkflow::new(&agent, &config.extraction, &known);
        let mut stats = ScoutStats::default();

        let extraction = workflow
            .process_topic(
                "budgeting",
                &[
                    VIDEO_A.to_string(),
                    "https://www.youtube.com/watch?v=dead".to_string(),
                    VIDEO_B.to_string(),
                ],
                &mut stats,
            )
            .await;

        assert_eq!(extraction.records.len(), 1);
        assert!(extraction.fatal.is_some());
        assert_eq!(stats.items_visited, 2);
    }
}
