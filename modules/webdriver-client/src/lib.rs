pub mod error;
pub mod types;

pub use error::{Result, WebDriverError};
pub use types::{Capabilities, ElementRef, Locator};

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use types::{Envelope, ErrorValue, NewSessionValue};

/// Entry point: talks to a chromedriver (or Selenium Grid) endpoint.
pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Start a browser session.
    pub async fn new_session(&self, capabilities: &Capabilities) -> Result<Session> {
        let value: NewSessionValue = send(
            &self.client,
            Method::POST,
            &format!("{}/session", self.base_url),
            Some(capabilities.to_body()),
        )
        .await?;

        tracing::info!(session_id = %value.session_id, "WebDriver session started");

        Ok(Session {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            id: value.session_id,
        })
    }
}

/// A live browser session. All commands act on its single current page.
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.id, path)
    }

    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        send(&self.client, method, &self.url(path), body).await
    }

    /// Navigate the current page and wait for the driver's page-load strategy.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let _: Value = self
            .command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    /// Run a synchronous script in the page and return its result.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    /// All elements matching `locator`. An empty match is `Ok(vec![])`.
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        self.command(Method::POST, "/elements", Some(locator.to_body()))
            .await
    }

    /// Rendered text of an element.
    pub async fn element_text(&self, element: &ElementRef) -> Result<String> {
        self.command(Method::GET, &format!("/element/{}/text", element.id), None)
            .await
    }

    /// Raw attribute value as written in the markup.
    pub async fn element_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>> {
        self.command(
            Method::GET,
            &format!("/element/{}/attribute/{}", element.id, name),
            None,
        )
        .await
    }

    /// DOM property value (e.g. the resolved absolute `href`).
    pub async fn element_property(&self, element: &ElementRef, name: &str) -> Result<Value> {
        self.command(
            Method::GET,
            &format!("/element/{}/property/{}", element.id, name),
            None,
        )
        .await
    }

    /// Serialized DOM of the current page.
    pub async fn page_source(&self) -> Result<String> {
        self.command(Method::GET, "/source", None).await
    }

    /// End the session and close the browser.
    pub async fn delete(&self) -> Result<()> {
        let _: Value = send(
            &self.client,
            Method::DELETE,
            &format!("{}/session/{}", self.base_url, self.id),
            None,
        )
        .await?;
        tracing::info!(session_id = %self.id, "WebDriver session closed");
        Ok(())
    }
}

async fn send<T: DeserializeOwned>(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<T> {
    let mut req = client.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }

    let resp = req.send().await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &text));
    }

    let envelope: Envelope<T> = serde_json::from_str(&text)?;
    Ok(envelope.value)
}

fn api_error(status: u16, body: &str) -> WebDriverError {
    match serde_json::from_str::<Envelope<ErrorValue>>(body) {
        Ok(env) => WebDriverError::Api {
            status,
            error: env.value.error,
            message: env.value.message,
        },
        Err(_) => WebDriverError::Api {
            status,
            error: "unknown error".to_string(),
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w3c_error_body_maps_to_api_error() {
        let err = api_error(
            404,
            r#"{"value":{"error":"invalid session id","message":"session deleted","stacktrace":""}}"#,
        );
        assert!(err.is_session_lost());
    }

    #[test]
    fn non_json_error_body_is_kept_as_message() {
        let err = api_error(502, "Bad Gateway");
        match err {
            WebDriverError::Api {
                status,
                error,
                message,
            } => {
                assert_eq!(status, 502);
                assert_eq!(error, "unknown error");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn no_such_element_is_not_fatal() {
        let err = api_error(
            404,
            r#"{"value":{"error":"no such element","message":"nope"}}"#,
        );
        assert!(matches!(&err, WebDriverError::Api { error, .. } if error == "no such element"));
        assert!(!err.is_session_lost());
    }

    #[test]
    fn session_urls_are_scoped_to_session_id() {
        let session = Session {
            client: reqwest::Client::new(),
            base_url: "http://localhost:9515".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(
            session.url("/element/e1/text"),
            "http://localhost:9515/session/abc/element/e1/text"
        );
    }

    #[tokio::test]
    async fn unreachable_driver_is_session_lost() {
        let client = WebDriverClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .new_session(&Capabilities::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_session_lost(), "got {err:?}");
    }
}
