//! REST bridge to a QuestDB server.
//!
//! QuestDB exposes SQL over HTTP as `GET /exec?query=<url-encoded sql>`.
//! The bridge builds that request and hands back the body. Two surfaces are
//! offered: [`QuestDbBridge::exec`] returns a typed `Result` so callers can
//! tell a server error from data, and [`QuestDbBridge::query`] folds non-200
//! responses into an `"Error <code>: <body>"` string, which is the shape the
//! table tools feed back to the model.
//!
//! The SQL text is URL-encoded but otherwise passed through verbatim. When
//! the query embeds model-influenced text (see
//! [`TableQueryTool`](crate::llm::tools::TableQueryTool)) that is an
//! injection risk on the server side. The bridge does not sanitize.

use crate::error::{AgentryError, Result};
use reqwest::Client;
use tracing::debug;

/// Configuration for connecting to a QuestDB server
#[derive(Debug, Clone)]
pub struct QuestDbConfig {
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for QuestDbConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("QUESTDB_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            timeout: None,
        }
    }
}

/// HTTP bridge to QuestDB's `/exec` endpoint
#[derive(Debug, Clone)]
pub struct QuestDbBridge {
    client: Client,
    config: QuestDbConfig,
}

impl QuestDbBridge {
    /// Create a bridge with default configuration
    pub fn new() -> Self {
        Self::with_config(QuestDbConfig::default())
    }

    /// Create a bridge with custom configuration
    pub fn with_config(config: QuestDbConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap();

        Self { client, config }
    }

    /// Create a bridge against a specific server URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_config(QuestDbConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    fn exec_url(&self, sql: &str) -> String {
        format!(
            "{}/exec?query={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(sql)
        )
    }

    /// Send the SQL and return the status code and body.
    ///
    /// Transport failures (connection refused, timeout) surface as `Err`;
    /// any HTTP response, success or not, is returned as-is.
    async fn send(&self, sql: &str) -> Result<(u16, String)> {
        debug!("QuestDB exec: {}", sql);

        let response = self.client.get(self.exec_url(sql)).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok((status, body))
    }

    /// Execute SQL, returning the response body on HTTP 200.
    ///
    /// Non-200 responses become a typed [`AgentryError::ApiError`].
    pub async fn exec(&self, sql: &str) -> Result<String> {
        let (status, body) = self.send(sql).await?;

        if status == 200 {
            Ok(body)
        } else {
            Err(AgentryError::ApiError(format!(
                "QuestDB returned {}: {}",
                status, body
            )))
        }
    }

    /// Execute SQL, folding HTTP failures into the returned string.
    ///
    /// Returns the body verbatim on HTTP 200, otherwise
    /// `"Error <code>: <body>"`. Only transport failures are `Err`. Tools
    /// use this surface so the model sees server errors as text it can
    /// react to.
    pub async fn query(&self, sql: &str) -> Result<String> {
        let (status, body) = self.send(sql).await?;

        if status == 200 {
            Ok(body)
        } else {
            Ok(format!("Error {}: {}", status, body))
        }
    }
}

impl Default for QuestDbBridge {
    fn default() -> Self {
        Self::new()
    }
}
