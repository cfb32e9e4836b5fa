// Test mocks for the scout pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockAgent (RenderingAgent): per-URL pages with scripted elements
// - MockCatalog (CatalogStore): scripted list pages and insert failures
//
// Plus `fast_config()`: defaults with every delay zeroed.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use airtable_client::Fields;

use crate::config::Config;
use crate::traits::{AgentError, AgentResult, CatalogPage, CatalogStore, Element, RenderingAgent};

/// Defaults with zero delays and zero field waits, so tests never sleep.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.discovery.initial_settle_ms = 0;
    config.discovery.scroll_pause_ms = 0;
    config.extraction.settle_delay_ms = 0;
    config.extraction.scroll_settle_ms = 0;
    config.extraction.field_timeout_secs = 0;
    config.sync.retry_delay_ms = 0;
    config.sync.jitter_min_ms = 0;
    config.sync.jitter_max_ms = 0;
    config
}

// ---------------------------------------------------------------------------
// MockAgent
// ---------------------------------------------------------------------------

/// An element a mock query can return.
#[derive(Debug, Clone)]
pub struct MockElement {
    text: String,
    href: Option<String>,
}

impl MockElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            href: None,
        }
    }

    pub fn link(href: &str) -> Self {
        Self {
            text: href.to_string(),
            href: Some(href.to_string()),
        }
    }
}

#[derive(Default)]
struct MockPage {
    source: String,
    /// Query -> element lists per scroll stage. Stage N is what the query
    /// returns after N+1 scrolls; the last stage repeats.
    elements: HashMap<String, Vec<Vec<MockElement>>>,
    failing_queries: HashSet<String>,
}

#[derive(Default)]
struct AgentState {
    current: Option<String>,
    scrolls_since_nav: usize,
    registry: HashMap<String, MockElement>,
    next_id: usize,
    disconnected: bool,
    navigations: Vec<String>,
    scripts: Vec<String>,
    query_counts: HashMap<String, usize>,
    quits: usize,
}

/// Scripted browser. Unregistered URLs load as empty pages.
/// Builder pattern: `.on_page()`, `.on_elements()`, `.on_scroll_stages()`,
/// `.fail_query()`, `.fail_navigation()`, `.disconnect_on()`.
pub struct MockAgent {
    pages: HashMap<String, MockPage>,
    failing_navigations: HashSet<String>,
    disconnect_urls: HashSet<String>,
    state: Mutex<AgentState>,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing_navigations: HashSet::new(),
            disconnect_urls: HashSet::new(),
            state: Mutex::new(AgentState::default()),
        }
    }

    fn page_mut(&mut self, url: &str) -> &mut MockPage {
        self.pages.entry(url.to_string()).or_default()
    }

    pub fn on_page(mut self, url: &str, source: &str) -> Self {
        self.page_mut(url).source = source.to_string();
        self
    }

    pub fn on_elements(mut self, url: &str, query: &str, elements: Vec<MockElement>) -> Self {
        self.page_mut(url)
            .elements
            .insert(query.to_string(), vec![elements]);
        self
    }

    pub fn on_scroll_stages(
        mut self,
        url: &str,
        query: &str,
        stages: Vec<Vec<MockElement>>,
    ) -> Self {
        self.page_mut(url).elements.insert(query.to_string(), stages);
        self
    }

    pub fn fail_query(mut self, url: &str, query: &str) -> Self {
        self.page_mut(url).failing_queries.insert(query.to_string());
        self
    }

    pub fn fail_navigation(mut self, url: &str) -> Self {
        self.failing_navigations.insert(url.to_string());
        self
    }

    /// Navigating to `url` kills the session; every later call fails fatally.
    pub fn disconnect_on(mut self, url: &str) -> Self {
        self.disconnect_urls.insert(url.to_string());
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn scripts_run(&self) -> Vec<String> {
        self.state.lock().unwrap().scripts.clone()
    }

    pub fn query_count(&self, query: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .query_counts
            .get(query)
            .copied()
            .unwrap_or(0)
    }

    pub fn quit_count(&self) -> usize {
        self.state.lock().unwrap().quits
    }

    fn check_connected(state: &AgentState) -> AgentResult<()> {
        if state.disconnected {
            return Err(AgentError::Disconnected("mock session closed".into()));
        }
        Ok(())
    }

    fn current_page<'s>(&'s self, state: &AgentState) -> Option<&'s MockPage> {
        state.current.as_ref().and_then(|url| self.pages.get(url))
    }

    fn lookup(&self, state: &AgentState, element: &Element) -> AgentResult<MockElement> {
        state
            .registry
            .get(element.id())
            .cloned()
            .ok_or_else(|| AgentError::Command(format!("stale element {}", element.id())))
    }
}

#[async_trait]
impl RenderingAgent for MockAgent {
    async fn navigate(&self, url: &str) -> AgentResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_connected(&state)?;
        state.navigations.push(url.to_string());

        if self.disconnect_urls.contains(url) {
            state.disconnected = true;
            return Err(AgentError::Disconnected(format!("browser died loading {url}")));
        }
        if self.failing_navigations.contains(url) {
            return Err(AgentError::Command(format!("navigation to {url} failed")));
        }

        state.current = Some(url.to_string());
        state.scrolls_since_nav = 0;
        state.registry.clear();
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> AgentResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_connected(&state)?;
        state.scripts.push(script.to_string());
        state.scrolls_since_nav += 1;
        Ok(())
    }

    async fn find_all(&self, query: &str) -> AgentResult<Vec<Element>> {
        let mut state = self.state.lock().unwrap();
        Self::check_connected(&state)?;
        *state.query_counts.entry(query.to_string()).or_default() += 1;

        let Some(page) = self.current_page(&state) else {
            return Ok(Vec::new());
        };
        if page.failing_queries.contains(query) {
            return Err(AgentError::Command(format!("query failed: {query}")));
        }
        let Some(stages) = page.elements.get(query).filter(|s| !s.is_empty()) else {
            return Ok(Vec::new());
        };

        let stage = state.scrolls_since_nav.saturating_sub(1).min(stages.len() - 1);
        let matched = stages[stage].clone();

        let mut found = Vec::with_capacity(matched.len());
        for element in matched {
            state.next_id += 1;
            let id = format!("mock-{}", state.next_id);
            state.registry.insert(id.clone(), element);
            found.push(Element::new(id));
        }
        Ok(found)
    }

    async fn text(&self, element: &Element) -> AgentResult<String> {
        let state = self.state.lock().unwrap();
        Self::check_connected(&state)?;
        Ok(self.lookup(&state, element)?.text)
    }

    async fn attribute(&self, element: &Element, name: &str) -> AgentResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Self::check_connected(&state)?;
        let found = self.lookup(&state, element)?;
        Ok(match name {
            "href" => found.href,
            _ => None,
        })
    }

    async fn page_source(&self) -> AgentResult<String> {
        let state = self.state.lock().unwrap();
        Self::check_connected(&state)?;
        Ok(self
            .current_page(&state)
            .map(|page| page.source.clone())
            .unwrap_or_default())
    }

    async fn quit(&self) -> AgentResult<()> {
        let mut state = self.state.lock().unwrap();
        state.quits += 1;
        state.disconnected = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CatalogState {
    list_calls: usize,
    insert_attempts: usize,
    failures_left: usize,
    inserted: Vec<Vec<Fields>>,
}

/// In-memory catalog. Pages are served in order with `page-N` continuation
/// tokens; inserts fail for the first `fail_inserts(n)` attempts.
pub struct MockCatalog {
    pages: Vec<Vec<Fields>>,
    failing_page: Option<usize>,
    state: Mutex<CatalogState>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            failing_page: None,
            state: Mutex::new(CatalogState::default()),
        }
    }

    pub fn with_page(mut self, records: Vec<Fields>) -> Self {
        self.pages.push(records);
        self
    }

    /// Channel names as single-field rows, all on one page.
    pub fn with_known(self, names: &[&str]) -> Self {
        let rows = names
            .iter()
            .map(|name| {
                let mut fields = Fields::new();
                fields.insert(
                    crate::pipeline::record::CHANNEL_NAME_FIELD.to_string(),
                    serde_json::Value::String(name.to_string()),
                );
                fields
            })
            .collect();
        self.with_page(rows)
    }

    /// Listing page `index` (0-based) returns an error.
    pub fn fail_listing_at(mut self, index: usize) -> Self {
        self.failing_page = Some(index);
        self
    }

    pub fn fail_inserts(self, count: usize) -> Self {
        self.state.lock().unwrap().failures_left = count;
        self
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn insert_attempts(&self) -> usize {
        self.state.lock().unwrap().insert_attempts
    }

    /// Sizes of the accepted batches, in order.
    pub fn insert_sizes(&self) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .inserted
            .iter()
            .map(Vec::len)
            .collect()
    }

    /// Channel names of every accepted record, in insert order.
    pub fn inserted_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .inserted
            .iter()
            .flatten()
            .filter_map(|fields| fields.get(crate::pipeline::record::CHANNEL_NAME_FIELD))
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MockCatalog {
    async fn list_page(&self, _fields: &[&str], offset: Option<&str>) -> Result<CatalogPage> {
        self.state.lock().unwrap().list_calls += 1;

        let index = match offset {
            None => 0,
            Some(token) => match token.strip_prefix("page-").and_then(|n| n.parse().ok()) {
                Some(n) => n,
                None => bail!("MockCatalog: bad offset {token}"),
            },
        };
        if self.failing_page == Some(index) {
            bail!("MockCatalog: listing page {index} failed");
        }

        let records = self.pages.get(index).cloned().unwrap_or_default();
        let offset = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(CatalogPage { records, offset })
    }

    async fn insert_batch(&self, records: &[Fields]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.insert_attempts += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            bail!("MockCatalog: insert rejected (HTTP 503)");
        }
        state.inserted.push(records.to_vec());
        Ok(())
    }
}
