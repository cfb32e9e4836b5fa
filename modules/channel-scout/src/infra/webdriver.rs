//! `RenderingAgent` over a live WebDriver session.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use webdriver_client::{Capabilities, ElementRef, Locator, Session, WebDriverClient, WebDriverError};

use crate::config::BrowserConfig;
use crate::traits::{AgentError, AgentResult, Element, RenderingAgent};

impl From<WebDriverError> for AgentError {
    fn from(err: WebDriverError) -> Self {
        if err.is_session_lost() {
            AgentError::Disconnected(err.to_string())
        } else {
            AgentError::Command(err.to_string())
        }
    }
}

pub struct WebDriverAgent {
    session: Session,
}

impl WebDriverAgent {
    /// Start a browser. `url_override` (from the environment) wins over the
    /// configured endpoint.
    pub async fn connect(config: &BrowserConfig, url_override: Option<&str>) -> Result<Self> {
        let endpoint = url_override.unwrap_or(&config.webdriver_url);
        info!(endpoint, headless = config.headless, "Starting browser session");

        let client = WebDriverClient::new(endpoint)?;
        let capabilities = Capabilities {
            headless: config.headless,
            args: config.args.clone(),
        };
        let session = client
            .new_session(&capabilities)
            .await
            .with_context(|| format!("Failed to start browser via {endpoint}"))?;
        info!(session_id = session.id(), "Browser ready");

        Ok(Self { session })
    }
}

fn element_ref(element: &Element) -> ElementRef {
    ElementRef {
        id: element.id().to_string(),
    }
}

#[async_trait]
impl RenderingAgent for WebDriverAgent {
    async fn navigate(&self, url: &str) -> AgentResult<()> {
        Ok(self.session.navigate(url).await?)
    }

    async fn execute_script(&self, script: &str) -> AgentResult<()> {
        self.session.execute(script, Vec::new()).await?;
        Ok(())
    }

    async fn find_all(&self, query: &str) -> AgentResult<Vec<Element>> {
        let found = self.session.find_elements(&Locator::xpath(query)).await?;
        Ok(found.into_iter().map(|r| Element::new(r.id)).collect())
    }

    async fn text(&self, element: &Element) -> AgentResult<String> {
        Ok(self.session.element_text(&element_ref(element)).await?)
    }

    async fn attribute(&self, element: &Element, name: &str) -> AgentResult<Option<String>> {
        let target = element_ref(element);
        // The property is the resolved value (absolute href); the attribute is
        // whatever the markup says.
        match self.session.element_property(&target, name).await? {
            Value::String(s) => Ok(Some(s)),
            Value::Null => Ok(self.session.element_attribute(&target, name).await?),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn page_source(&self) -> AgentResult<String> {
        Ok(self.session.page_source().await?)
    }

    async fn quit(&self) -> AgentResult<()> {
        Ok(self.session.delete().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_session_maps_to_disconnected() {
        let err: AgentError = WebDriverError::Api {
            status: 404,
            error: "invalid session id".into(),
            message: "session deleted".into(),
        }
        .into();
        assert!(err.is_fatal());
    }

    #[test]
    fn stale_element_is_not_fatal() {
        let err: AgentError = WebDriverError::Api {
            status: 404,
            error: "stale element reference".into(),
            message: "element is not attached".into(),
        }
        .into();
        assert!(matches!(err, AgentError::Command(_)));
        assert!(!err.is_fatal());
    }
}
