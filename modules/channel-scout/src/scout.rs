use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::pipeline::discovery::DiscoveryEngine;
use crate::pipeline::record::ProfileRecord;
use crate::pipeline::stats::ScoutStats;
use crate::pipeline::sync::CatalogClient;
use crate::pipeline::workflow::ExtractionWorkflow;
use crate::traits::{is_fatal, CatalogStore, RenderingAgent};

/// One run over every configured topic: discover, extract, sync.
pub struct Scout<'a> {
    agent: &'a dyn RenderingAgent,
    store: &'a dyn CatalogStore,
    config: &'a Config,
    dry_run: bool,
}

impl<'a> Scout<'a> {
    pub fn new(agent: &'a dyn RenderingAgent, store: &'a dyn CatalogStore, config: &'a Config) -> Self {
        Self {
            agent,
            store,
            config,
            dry_run: false,
        }
    }

    /// Log records instead of writing them to the catalog.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run a full scout cycle. The agent is released whatever the outcome.
    pub async fn run(&self) -> Result<ScoutStats> {
        let result = self.run_inner().await;

        // Always release the browser
        if let Err(e) = self.agent.quit().await {
            error!("Failed to close rendering agent: {e}");
        }

        result
    }

    async fn run_inner(&self) -> Result<ScoutStats> {
        let mut stats = ScoutStats::new();
        let catalog = CatalogClient::new(self.store, &self.config.sync);

        // Fetched once; channels synced during this run are caught by the
        // workflow's visited set instead.
        let known = catalog.fetch_known_identities().await;

        let discovery = DiscoveryEngine::new(self.agent, &self.config.discovery);
        let mut workflow = ExtractionWorkflow::new(self.agent, &self.config.extraction, &known);

        let topics = &self.config.scout.topics;
        for (idx, topic) in topics.iter().map(String::as_str).enumerate() {
            info!(topic, n = idx + 1, total = topics.len(), "Starting topic");

            let links = match discovery.discover(topic).await {
                Ok(links) => links,
                Err(e) if is_fatal(&e) => {
                    stats.topics_failed += 1;
                    error!(topic, error = format!("{e:#}"), "Rendering agent lost during discovery");
                    warn!("{stats}");
                    return Err(e);
                }
                Err(e) => {
                    stats.topics_failed += 1;
                    warn!(topic, error = format!("{e:#}"), "Discovery failed, skipping topic");
                    continue;
                }
            };
            stats.links_discovered += links.len() as u32;
            info!(topic, links = links.len(), "Discovered video links");

            let extraction = workflow.process_topic(topic, &links, &mut stats).await;

            // Sync whatever was extracted, even if the agent died mid-topic.
            self.sync(&catalog, topic, &extraction.records, &mut stats).await;

            if let Some(e) = extraction.fatal {
                stats.topics_failed += 1;
                error!(topic, error = format!("{e:#}"), "Rendering agent lost during extraction");
                warn!("{stats}");
                return Err(e);
            }

            stats.topics_completed += 1;
            info!(topic, records = extraction.records.len(), "Topic done");
        }

        info!(
            visited_channels = workflow.visited().len(),
            "Scout run complete"
        );
        Ok(stats)
    }

    async fn sync(
        &self,
        catalog: &CatalogClient<'_>,
        topic: &str,
        records: &[ProfileRecord],
        stats: &mut ScoutStats,
    ) {
        if records.is_empty() {
            info!(topic, "No new channels to upload");
            return;
        }

        if self.dry_run {
            for record in records {
                let fields = serde_json::Value::Object(record.to_fields());
                info!(topic, record = %fields, "Dry run, not uploading");
            }
            return;
        }

        info!(topic, records = records.len(), "Uploading to catalog");
        let report = catalog.sync_batch(records).await;
        stats.chunks_synced += report.chunks_synced;
        stats.chunks_spilled += report.chunks_spilled;
        stats.records_synced += report.records_synced;
        stats.records_spilled += report.records_spilled;
    }
}
