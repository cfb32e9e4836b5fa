//! Catalog sync: read the known-channel set, write new records in chunks.
//!
//! Nothing here fails the run. Listing errors return what was read so far;
//! a chunk that exhausts its retries is spilled to the failure log and the
//! next chunk proceeds.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use airtable_client::Fields;

use super::record::{ProfileRecord, CHANNEL_NAME_FIELD};
use crate::config::SyncConfig;
use crate::infra::FailureLog;
use crate::traits::CatalogStore;

/// Outcome of one `sync_batch` call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub chunks_synced: u32,
    pub chunks_spilled: u32,
    pub records_synced: u32,
    pub records_spilled: u32,
}

pub struct CatalogClient<'a> {
    store: &'a dyn CatalogStore,
    config: &'a SyncConfig,
    failure_log: FailureLog,
}

impl<'a> CatalogClient<'a> {
    pub fn new(store: &'a dyn CatalogStore, config: &'a SyncConfig) -> Self {
        Self {
            store,
            config,
            failure_log: FailureLog::new(&config.failure_log),
        }
    }

    /// Every channel name currently in the catalog.
    pub async fn fetch_known_identities(&self) -> HashSet<String> {
        let mut known = HashSet::new();
        let mut offset: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = match self
                .store
                .list_page(&[CHANNEL_NAME_FIELD], offset.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        error = format!("{e:#}"),
                        pages,
                        known = known.len(),
                        "Catalog listing failed, continuing with partial known set"
                    );
                    break;
                }
            };
            pages += 1;

            known.extend(
                page.records
                    .iter()
                    .filter_map(|fields| fields.get(CHANNEL_NAME_FIELD))
                    .filter_map(|value| value.as_str())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        info!(pages, known = known.len(), "Fetched existing channel names");
        known
    }

    /// Insert `records` chunk by chunk.
    pub async fn sync_batch(&self, records: &[ProfileRecord]) -> SyncReport {
        let mut report = SyncReport::default();
        if records.is_empty() {
            return report;
        }

        let rows: Vec<Fields> = records.iter().map(ProfileRecord::to_fields).collect();
        let chunk_size = self.config.chunk_size.max(1);
        let total = rows.len().div_ceil(chunk_size);

        for (idx, chunk) in rows.chunks(chunk_size).enumerate() {
            let batch = idx + 1;
            if self.insert_with_retry(chunk, batch, total).await {
                report.chunks_synced += 1;
                report.records_synced += chunk.len() as u32;
            } else {
                self.spill(chunk, batch);
                report.chunks_spilled += 1;
                report.records_spilled += chunk.len() as u32;
            }

            if batch < total {
                tokio::time::sleep(self.jitter()).await;
            }
        }

        report
    }

    async fn insert_with_retry(&self, chunk: &[Fields], batch: usize, total: usize) -> bool {
        let attempts = self.config.retry_count.max(1);
        for attempt in 1..=attempts {
            match self.store.insert_batch(chunk).await {
                Ok(()) => {
                    info!(batch, total, records = chunk.len(), "Uploaded batch");
                    return true;
                }
                Err(e) => {
                    warn!(
                        batch,
                        attempt,
                        attempts,
                        error = format!("{e:#}"),
                        "Batch upload failed"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }
        false
    }

    fn spill(&self, chunk: &[Fields], batch: usize) {
        warn!(batch, records = chunk.len(), "Giving up on batch after retries");
        if let Err(e) = self.failure_log.append(chunk) {
            error!(
                batch,
                path = %self.failure_log.path().display(),
                error = format!("{e:#}"),
                "Failed to write failure log, batch is lost"
            );
        }
    }

    fn jitter(&self) -> Duration {
        let ms = rand::rng().random_range(self.config.jitter_min_ms..=self.config.jitter_max_ms);
        Duration::from_millis(ms)
    }
}
