use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Key under which W3C drivers return element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4a5b6e3b8f1d";

/// Every WebDriver response wraps its payload in `value`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub value: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSessionValue {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Opaque reference to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52f-4a5b6e3b8f1d")]
    pub id: String,
}

/// Element lookup strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    XPath(String),
}

impl Locator {
    pub fn xpath(query: impl Into<String>) -> Self {
        Locator::XPath(query.into())
    }

    pub(crate) fn to_body(&self) -> Value {
        match self {
            Locator::XPath(q) => json!({ "using": "xpath", "value": q }),
        }
    }
}

/// Chrome capabilities for a new session.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub headless: bool,
    pub args: Vec<String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            headless: false,
            args: vec![
                "--disable-gpu".to_string(),
                "--no-sandbox".to_string(),
                "--mute-audio".to_string(),
            ],
        }
    }
}

impl Capabilities {
    pub(crate) fn to_body(&self) -> Value {
        let mut args = self.args.clone();
        if self.headless && !args.iter().any(|a| a.starts_with("--headless")) {
            args.push("--headless=new".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}
