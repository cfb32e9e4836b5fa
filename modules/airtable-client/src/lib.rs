pub mod error;
pub mod types;

pub use error::{AirtableError, Result};
pub use types::{Fields, ListPage, Record};

use std::time::Duration;

use types::{CreateRecordsRequest, CreateRecordsResponse, NewRecord};

const BASE_URL: &str = "https://api.airtable.com/v0";

/// Airtable rejects create calls carrying more records than this.
pub const MAX_RECORDS_PER_REQUEST: usize = 10;

pub struct AirtableClient {
    client: reqwest::Client,
    base_url: String,
    base_id: String,
    api_key: String,
}

impl AirtableClient {
    pub fn new(api_key: &str, base_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            base_id: base_id.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.base_id, table)
    }

    /// Fetch one page of records, projected onto `fields`.
    /// Pass the previous page's `offset` to continue.
    pub async fn list_records(
        &self,
        table: &str,
        fields: &[&str],
        offset: Option<&str>,
    ) -> Result<ListPage> {
        let mut query: Vec<(&str, &str)> = fields.iter().map(|f| ("fields[]", *f)).collect();
        if let Some(offset) = offset {
            query.push(("offset", offset));
        }

        let resp = self
            .client
            .get(self.table_url(table))
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AirtableError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let page: ListPage = resp.json().await?;
        tracing::debug!(
            table,
            records = page.records.len(),
            more = page.offset.is_some(),
            "Listed Airtable page"
        );
        Ok(page)
    }

    /// Create up to `MAX_RECORDS_PER_REQUEST` records in one call.
    pub async fn create_records(&self, table: &str, records: &[Fields]) -> Result<Vec<Record>> {
        if records.len() > MAX_RECORDS_PER_REQUEST {
            return Err(AirtableError::BatchTooLarge {
                count: records.len(),
                max: MAX_RECORDS_PER_REQUEST,
            });
        }

        let body = CreateRecordsRequest {
            records: records.iter().map(|fields| NewRecord { fields }).collect(),
        };

        let resp = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() != 200 && status.as_u16() != 201 {
            let message = resp.text().await.unwrap_or_default();
            return Err(AirtableError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreateRecordsResponse = resp.json().await?;
        tracing::debug!(table, created = created.records.len(), "Created Airtable records");
        Ok(created.records)
    }
}
