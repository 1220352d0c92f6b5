//! Web search tool backed by DuckDuckGo's lite endpoint.
//!
//! No API key required. The lite endpoint serves plain HTML tables, which
//! are scraped for organic results.

use crate::error::{AgentryError, Result};
use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://lite.duckduckgo.com/lite/";
const MAX_RESULTS: usize = 10;
const TIMEOUT_SECONDS: u64 = 10;

/// A single organic search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Tool for searching the web with DuckDuckGo
#[derive(Clone)]
pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
}

impl WebSearchTool {
    /// Creates a new WebSearchTool instance
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a tool pointed at a custom endpoint (used in tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECONDS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query));

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AgentryError::ApiError(format!(
                "search request failed with status {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        parse_results(&html)
    }
}

/// Extract organic results from the lite endpoint's HTML
fn parse_results(html: &str) -> Result<Vec<SearchResult>> {
    let document = Html::parse_document(html);

    let link_selector = Selector::parse("a.result-link")
        .map_err(|e| AgentryError::ParseError(format!("invalid selector: {:?}", e)))?;
    let snippet_selector = Selector::parse("td.result-snippet")
        .map_err(|e| AgentryError::ParseError(format!("invalid selector: {:?}", e)))?;

    let snippets: Vec<String> = document
        .select(&snippet_selector)
        .map(|s| collapse_whitespace(&s.text().collect::<Vec<_>>().join(" ")))
        .collect();

    let results = document
        .select(&link_selector)
        .take(MAX_RESULTS)
        .enumerate()
        .filter_map(|(i, link)| {
            let href = link.value().attr("href")?;
            let title = collapse_whitespace(&link.text().collect::<Vec<_>>().join(" "));

            Some(SearchResult {
                title,
                url: resolve_redirect(href),
                snippet: snippets.get(i).cloned().unwrap_or_default(),
            })
        })
        .collect();

    Ok(results)
}

/// Unwrap DuckDuckGo redirect URLs of the form
/// `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com`
fn resolve_redirect(url: &str) -> String {
    if let Some(encoded) = url.split("uddg=").nth(1) {
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.to_string();
        }
    }
    url.to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmTool for WebSearchTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let query = args.get("query").and_then(|v| v.as_str()).ok_or_else(|| {
            AgentryError::InvalidArgument("query parameter is required".to_string())
        })?;

        if query.is_empty() {
            return Err(AgentryError::InvalidArgument(
                "query parameter cannot be empty".to_string(),
            ));
        }

        let results = self.search(query).await?;

        Ok(json!(results))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: "web_search".to_string(),
                description: "Search the web for current information using DuckDuckGo. Returns organic results with title, URL, and snippet.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                }),
            },
        }
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}
