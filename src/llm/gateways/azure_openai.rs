//! Gateway for Azure-hosted OpenAI deployments.
//!
//! Azure addresses models by deployment name in the URL rather than by a
//! model field in the body, and authenticates with an `api-key` header.
//! Credentials are read once at startup via [`AzureOpenAIConfig::from_env`].

use crate::error::{AgentryError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage, LlmToolCall, MessageRole};
use crate::llm::tools::LlmTool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Configuration for connecting to an Azure OpenAI deployment
#[derive(Debug, Clone)]
pub struct AzureOpenAIConfig {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout: Option<std::time::Duration>,
}

impl AzureOpenAIConfig {
    /// Read the configuration from the environment.
    ///
    /// Expects `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`, and
    /// `AZURE_OPENAI_DEPLOYMENT_NAME`; `AZURE_OPENAI_API_VERSION` is
    /// optional and defaults to a recent stable version.
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .map_err(|_| AgentryError::ConfigError(format!("{} is not set", name)))
        };

        Ok(Self {
            api_key: required("AZURE_OPENAI_API_KEY")?,
            endpoint: required("AZURE_OPENAI_ENDPOINT")?,
            deployment: required("AZURE_OPENAI_DEPLOYMENT_NAME")?,
            api_version: std::env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            timeout: None,
        })
    }
}

/// Gateway for the Azure OpenAI service
pub struct AzureOpenAIGateway {
    client: Client,
    config: AzureOpenAIConfig,
}

impl AzureOpenAIGateway {
    /// Create a new gateway from an explicit configuration
    pub fn with_config(config: AzureOpenAIConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap();

        Self { client, config }
    }

    /// Create a new gateway configured from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(AzureOpenAIConfig::from_env()?))
    }

    /// The deployment name requests are routed to
    pub fn deployment(&self) -> &str {
        &self.config.deployment
    }

    fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }
}

/// Map conversation turns into the OpenAI chat message shape.
///
/// OpenAI encodes tool-call arguments as a JSON string, and tool results
/// reference their call by `tool_call_id`.
fn adapt_messages(messages: &[LlmMessage]) -> Result<Vec<Value>> {
    let mut adapted = Vec::with_capacity(messages.len());

    for m in messages {
        match m.role {
            MessageRole::System => adapted.push(json!({
                "role": "system",
                "content": m.content.clone().unwrap_or_default(),
            })),
            MessageRole::User => adapted.push(json!({
                "role": "user",
                "content": m.content.clone().unwrap_or_default(),
            })),
            MessageRole::Assistant => {
                let mut msg = json!({ "role": "assistant" });

                if let Some(content) = &m.content {
                    msg["content"] = json!(content);
                }

                if let Some(calls) = &m.tool_calls {
                    let mut wire_calls = Vec::with_capacity(calls.len());
                    for (i, c) in calls.iter().enumerate() {
                        wire_calls.push(json!({
                            "id": c.id.clone().unwrap_or_else(|| format!("call_{}", i)),
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": serde_json::to_string(&c.arguments)?,
                            }
                        }));
                    }
                    msg["tool_calls"] = Value::Array(wire_calls);
                }

                adapted.push(msg);
            }
            MessageRole::Tool => {
                let call_id = m
                    .tool_calls
                    .as_ref()
                    .and_then(|calls| calls.first())
                    .and_then(|c| c.id.clone())
                    .unwrap_or_else(|| "call_0".to_string());

                adapted.push(json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": m.content.clone().unwrap_or_default(),
                }));
            }
        }
    }

    Ok(adapted)
}

/// Parse tool calls from an OpenAI response message
fn parse_tool_calls(message: &Value) -> Vec<LlmToolCall> {
    let Some(calls) = message["tool_calls"].as_array() else {
        return vec![];
    };

    calls
        .iter()
        .filter_map(|call| {
            let name = call["function"]["name"].as_str()?.to_string();
            let raw_args = call["function"]["arguments"].as_str()?;

            // Arguments arrive as a JSON-encoded string
            let arguments: HashMap<String, Value> = match serde_json::from_str(raw_args) {
                Ok(args) => args,
                Err(e) => {
                    warn!("Discarding tool call with unparseable arguments: {}", e);
                    return None;
                }
            };

            Some(LlmToolCall {
                id: call["id"].as_str().map(String::from),
                name,
                arguments,
            })
        })
        .collect()
}

#[async_trait]
impl LlmGateway for AzureOpenAIGateway {
    async fn complete(
        &self,
        _model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        // The deployment in the URL selects the model; `_model` is unused.
        info!("Delegating to Azure OpenAI deployment {}", self.config.deployment);
        debug!("Message count: {}", messages.len());

        let mut body = json!({
            "messages": adapt_messages(messages)?,
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
        });

        if let Some(tools) = tools {
            let tool_defs: Vec<_> = tools.iter().map(|t| t.descriptor()).collect();
            body["tools"] = serde_json::to_value(tool_defs)?;
        }

        let response = self
            .client
            .post(self.chat_completions_url())
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentryError::GatewayError(format!(
                "Azure OpenAI API error {}: {}",
                status, body
            )));
        }

        let response_body: Value = response.json().await?;
        let message = &response_body["choices"][0]["message"];

        let content = message["content"].as_str().map(String::from);
        let tool_calls = parse_tool_calls(message);

        Ok(LlmGatewayResponse {
            content,
            tool_calls,
        })
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        debug!("Fetching Azure OpenAI deployments");

        let url = format!(
            "{}/openai/deployments?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.api_version
        );

        let response = self
            .client
            .get(url)
            .header("api-key", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentryError::GatewayError(format!(
                "Failed to get deployments: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;

        let models = body["data"]
            .as_array()
            .ok_or_else(|| AgentryError::GatewayError("Invalid response format".to_string()))?
            .iter()
            .filter_map(|d| d["id"].as_str().map(String::from))
            .collect::<Vec<_>>();

        Ok(models)
    }
}
