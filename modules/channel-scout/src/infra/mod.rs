pub mod airtable;
pub mod failure_log;
pub mod webdriver;

pub use airtable::AirtableTable;
pub use failure_log::FailureLog;
pub use webdriver::WebDriverAgent;
