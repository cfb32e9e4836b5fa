//! Topic discovery: scroll a search results page and harvest video links.

use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::DiscoveryConfig;
use crate::traits::RenderingAgent;

/// Result anchors on the search page.
pub const VIDEO_ANCHOR_QUERY: &str = r#"//a[@id="video-title"]"#;

/// Only hrefs containing this are video pages (shorts and playlists are not).
pub const CONTENT_MARKER: &str = "watch";

pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.documentElement.scrollHeight);";

pub struct DiscoveryEngine<'a> {
    agent: &'a dyn RenderingAgent,
    config: &'a DiscoveryConfig,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(agent: &'a dyn RenderingAgent, config: &'a DiscoveryConfig) -> Self {
        Self { agent, config }
    }

    /// Unique video links for `topic`, in discovery order.
    ///
    /// Scrolls at most `max_scrolls` times, stopping early once a pass adds
    /// nothing or `max_links_per_topic` is reached. Any agent failure aborts
    /// discovery for this topic.
    pub async fn discover(&self, topic: &str) -> Result<Vec<String>> {
        let search = search_url(&self.config.search_url, topic)?;
        self.agent
            .navigate(&search)
            .await
            .with_context(|| format!("Failed to open search results for '{topic}'"))?;
        tokio::time::sleep(self.config.initial_settle()).await;

        let cap = self.config.max_links_per_topic;
        let mut links: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for pass in 1..=self.config.max_scrolls {
            let previous = links.len();

            self.agent.execute_script(SCROLL_TO_BOTTOM).await?;
            tokio::time::sleep(self.config.scroll_pause()).await;

            let anchors = self.agent.find_all(VIDEO_ANCHOR_QUERY).await?;
            for anchor in &anchors {
                if links.len() >= cap {
                    break;
                }
                let Some(href) = self.agent.attribute(anchor, "href").await? else {
                    continue;
                };
                if href.contains(CONTENT_MARKER) && seen.insert(href.clone()) {
                    links.push(href);
                }
            }

            info!(topic, pass, collected = links.len(), "Collected video links so far");

            if links.len() == previous || links.len() >= cap {
                info!(topic, pass, "No more new videos found, stopping scroll");
                break;
            }
        }

        Ok(links)
    }
}

/// Search results URL for a topic, with the topic as `search_query`.
pub fn search_url(base: &str, topic: &str) -> Result<String> {
    let url = url::Url::parse_with_params(base, &[("search_query", topic)])
        .with_context(|| format!("Invalid search URL: {base}"))?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_config, MockAgent, MockElement};

    fn results_url(topic: &str) -> String {
        search_url(&fast_config().discovery.search_url, topic).unwrap()
    }

    fn videos(ids: &[&str]) -> Vec<MockElement> {
        ids.iter()
            .map(|id| MockElement::link(&format!("https://www.youtube.com/watch?v={id}")))
            .collect()
    }

    #[test]
    fn topic_is_percent_encoded() {
        let url = search_url("https://www.youtube.com/results", "ETF vs stocks & bonds").unwrap();
        assert_eq!(
            url,
            "https://www.youtube.com/results?search_query=ETF+vs+stocks+%26+bonds"
        );
    }

    #[tokio::test]
    async fn stops_when_a_pass_adds_nothing() {
        let config = DiscoveryConfig {
            max_scrolls: 5,
            ..fast_config().discovery
        };
        let url = results_url("budgeting");
        let agent = MockAgent::new().on_scroll_stages(
            &url,
            VIDEO_ANCHOR_QUERY,
            vec![videos(&["a", "b"]), videos(&["a", "b", "c"]), videos(&["a", "b", "c"])],
        );

        let links = DiscoveryEngine::new(&agent, &config)
            .discover("budgeting")
            .await
            .unwrap();

        assert_eq!(links.len(), 3);
        // Third pass repeated the second pass's count, so scrolling stopped there.
        assert_eq!(agent.scripts_run().len(), 3);
    }

    #[tokio::test]
    async fn never_exceeds_link_cap() {
        let config = DiscoveryConfig {
            max_scrolls: 5,
            max_links_per_topic: 4,
            ..fast_config().discovery
        };
        let url = results_url("investing");
        let agent = MockAgent::new().on_scroll_stages(
            &url,
            VIDEO_ANCHOR_QUERY,
            vec![videos(&["1", "2", "3"]), videos(&["1", "2", "3", "4", "5", "6"])],
        );

        let links = DiscoveryEngine::new(&agent, &config)
            .discover("investing")
            .await
            .unwrap();

        assert_eq!(links.len(), 4);
        assert_eq!(agent.scripts_run().len(), 2);
    }

    #[tokio::test]
    async fn respects_max_scrolls() {
        let config = DiscoveryConfig {
            max_scrolls: 2,
            ..fast_config().discovery
        };
        let url = results_url("saving");
        let agent = MockAgent::new().on_scroll_stages(
            &url,
            VIDEO_ANCHOR_QUERY,
            vec![videos(&["a"]), videos(&["a", "b"]), videos(&["a", "b", "c"])],
        );

        let links = DiscoveryEngine::new(&agent, &config)
            .discover("saving")
            .await
            .unwrap();

        assert_eq!(links, vec![
            "https://www.youtube.com/watch?v=a",
            "https://www.youtube.com/watch?v=b",
        ]);
    }

    #[tokio::test]
    async fn skips_non_video_and_duplicate_anchors() {
        let config = fast_config().discovery;
        let url = results_url("debt");
        let mut anchors = videos(&["x", "x"]);
        anchors.push(MockElement::link("https://www.youtube.com/shorts/abc"));
        anchors.push(MockElement::text("no href"));
        anchors.extend(videos(&["y"]));
        let agent = MockAgent::new().on_elements(&url, VIDEO_ANCHOR_QUERY, anchors);

        let links = DiscoveryEngine::new(&agent, &config)
            .discover("debt")
            .await
            .unwrap();

        assert_eq!(links, vec![
            "https://www.youtube.com/watch?v=x",
            "https://www.youtube.com/watch?v=y",
        ]);
    }

    #[tokio::test]
    async fn agent_failure_aborts_discovery() {
        let config = fast_config().discovery;
        let url = results_url("crypto");
        let agent = MockAgent::new().fail_navigation(&url);

        let result = DiscoveryEngine::new(&agent, &config).discover("crypto").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failing_anchor_query_aborts_discovery() {
        let config = fast_config().discovery;
        let url = results_url("retirement");
        let agent = MockAgent::new()
            .on_elements(&url, VIDEO_ANCHOR_QUERY, videos(&["a"]))
            .fail_query(&url, VIDEO_ANCHOR_QUERY);

        let result = DiscoveryEngine::new(&agent, &config)
            .discover("retirement")
            .await;
        assert!(result.is_err());
    }
}
