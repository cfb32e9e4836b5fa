use anyhow::Result;
use async_trait::async_trait;

use airtable_client::{AirtableClient, Fields};

use crate::traits::{CatalogPage, CatalogStore};

/// `CatalogStore` backed by one Airtable table.
pub struct AirtableTable {
    client: AirtableClient,
    table: String,
}

impl AirtableTable {
    pub fn new(client: AirtableClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
        }
    }
}

#[async_trait]
impl CatalogStore for AirtableTable {
    async fn list_page(&self, fields: &[&str], offset: Option<&str>) -> Result<CatalogPage> {
        let page = self.client.list_records(&self.table, fields, offset).await?;
        Ok(CatalogPage {
            records: page.records.into_iter().map(|r| r.fields).collect(),
            offset: page.offset,
        })
    }

    async fn insert_batch(&self, records: &[Fields]) -> Result<()> {
        self.client.create_records(&self.table, records).await?;
        Ok(())
    }
}
