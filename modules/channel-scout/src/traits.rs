// Trait abstractions for the two external collaborators.
//
// RenderingAgent: a browser positioned on one page at a time. Navigation,
//   script execution and structural (XPath) queries.
// CatalogStore: the remote table of already-known channels. Paginated
//   listing and small batch inserts.
//
// Both are mocked in `testing` so the whole pipeline runs without a browser
// or network.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use airtable_client::Fields;

/// How often `wait_for_first` re-issues its query.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// RenderingAgent
// ---------------------------------------------------------------------------

pub type AgentResult<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No element matched `{query}` before the wait expired")]
    NotFound { query: String },

    /// The browser session is gone; nothing further can be driven.
    #[error("Rendering agent disconnected: {0}")]
    Disconnected(String),

    #[error("Agent command failed: {0}")]
    Command(String),
}

impl AgentError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::Disconnected(_))
    }
}

/// True when `err` carries an `AgentError` that ends the whole run.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<AgentError>()
        .is_some_and(AgentError::is_fatal)
}

/// Handle to an element on the agent's current page. Stale after navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    id: String,
}

impl Element {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
pub trait RenderingAgent: Send + Sync {
    async fn navigate(&self, url: &str) -> AgentResult<()>;

    async fn execute_script(&self, script: &str) -> AgentResult<()>;

    /// All elements matching an XPath query on the current page.
    async fn find_all(&self, query: &str) -> AgentResult<Vec<Element>>;

    async fn text(&self, element: &Element) -> AgentResult<String>;

    async fn attribute(&self, element: &Element, name: &str) -> AgentResult<Option<String>>;

    async fn page_source(&self) -> AgentResult<String>;

    /// Release the browser. Called exactly once, on every exit path.
    async fn quit(&self) -> AgentResult<()>;

    /// First element matching `query`, polling until `timeout` elapses.
    /// Non-fatal query errors count as "not there yet".
    async fn wait_for_first(&self, query: &str, timeout: Duration) -> AgentResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_all(query).await {
                Ok(found) => {
                    if let Some(first) = found.into_iter().next() {
                        return Ok(first);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!(query, error = %e, "Query failed while waiting"),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AgentError::NotFound {
                    query: query.to_string(),
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

/// One page of catalog rows. `offset` is the continuation token.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub records: Vec<Fields>,
    pub offset: Option<String>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch one page projected onto `fields`, continuing from `offset`.
    async fn list_page(&self, fields: &[&str], offset: Option<&str>) -> Result<CatalogPage>;

    /// Insert one batch. Errors are transient from the caller's view.
    async fn insert_batch(&self, records: &[Fields]) -> Result<()>;
}
