//! Gateway for Ollama-hosted models.
//!
//! Speaks the `/api/chat` protocol with native tool calling, against a local
//! or remote Ollama server.

use crate::error::{AgentryError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage, LlmToolCall, MessageRole};
use crate::llm::tools::LlmTool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// Configuration for connecting to an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub host: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            timeout: None,
        }
    }
}

/// Gateway for the Ollama LLM service
///
/// Provides access to models served by Ollama, supporting text generation
/// and tool calling.
pub struct OllamaGateway {
    client: Client,
    config: OllamaConfig,
}

impl OllamaGateway {
    /// Create a new Ollama gateway with default configuration
    pub fn new() -> Self {
        Self::with_config(OllamaConfig::default())
    }

    /// Create a new Ollama gateway with custom configuration
    pub fn with_config(config: OllamaConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap();

        Self { client, config }
    }

    /// Create gateway with a custom host
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::with_config(OllamaConfig {
            host: host.into(),
            ..Default::default()
        })
    }
}

impl Default for OllamaGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Map conversation turns into Ollama's chat message shape
fn adapt_messages(messages: &[LlmMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            };

            let mut msg = json!({
                "role": role,
                "content": m.content.clone().unwrap_or_default(),
            });

            if m.role == MessageRole::Assistant {
                if let Some(calls) = &m.tool_calls {
                    msg["tool_calls"] = Value::Array(
                        calls
                            .iter()
                            .map(|c| {
                                json!({
                                    "function": {
                                        "name": c.name,
                                        "arguments": c.arguments,
                                    }
                                })
                            })
                            .collect(),
                    );
                }
            }

            msg
        })
        .collect()
}

/// Pull generation options out of the completion config
fn extract_options(config: &CompletionConfig) -> Value {
    let mut options = json!({
        "temperature": config.temperature,
        "num_ctx": config.num_ctx,
    });

    if let Some(num_predict) = config.num_predict {
        options["num_predict"] = json!(num_predict);
    }

    options
}

/// Parse tool calls from an Ollama chat response message
fn parse_tool_calls(message: &Value) -> Vec<LlmToolCall> {
    let Some(calls) = message["tool_calls"].as_array() else {
        return vec![];
    };

    calls
        .iter()
        .filter_map(|call| {
            let name = call["function"]["name"].as_str()?.to_string();
            let args = call["function"]["arguments"].as_object()?;

            let arguments: HashMap<String, Value> =
                args.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

            Some(LlmToolCall {
                id: call["id"].as_str().map(String::from),
                name,
                arguments,
            })
        })
        .collect()
}

#[async_trait]
impl LlmGateway for OllamaGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to Ollama for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let mut body = json!({
            "model": model,
            "messages": adapt_messages(messages),
            "options": extract_options(config),
            "stream": false
        });

        if let Some(tools) = tools {
            let tool_defs: Vec<_> = tools.iter().map(|t| t.descriptor()).collect();
            body["tools"] = serde_json::to_value(tool_defs)?;
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.config.host))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentryError::GatewayError(format!(
                "Ollama API error: {}",
                response.status()
            )));
        }

        let response_body: Value = response.json().await?;

        let content = response_body["message"]["content"].as_str().map(String::from);
        let tool_calls = parse_tool_calls(&response_body["message"]);

        Ok(LlmGatewayResponse {
            content,
            tool_calls,
        })
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        debug!("Fetching available Ollama models");

        let response = self.client.get(format!("{}/api/tags", self.config.host)).send().await?;

        if !response.status().is_success() {
            return Err(AgentryError::GatewayError(format!(
                "Failed to get models: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;

        let models = body["models"]
            .as_array()
            .ok_or_else(|| AgentryError::GatewayError("Invalid response format".to_string()))?
            .iter()
            .filter_map(|m| m["name"].as_str().map(String::from))
            .collect::<Vec<_>>();

        Ok(models)
    }
}
