use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cell values keyed by field name, as Airtable sends and accepts them.
pub type Fields = Map<String, Value>;

/// A single record as returned by list and create calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "createdTime")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: Fields,
}

/// One page of a list call. `offset` is present while more pages remain.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub records: Vec<Record>,
    pub offset: Option<String>,
}

/// Body of a create call.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRecordsRequest<'a> {
    pub records: Vec<NewRecord<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRecord<'a> {
    pub fields: &'a Fields,
}

/// Response of a create call.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordsResponse {
    #[serde(default)]
    pub records: Vec<Record>,
}
