//! The tool-calling loop at the heart of every agent executor.
//!
//! The broker repeatedly prompts the model, executes whatever tool calls it
//! asks for, feeds the results back, and returns the final text answer once
//! the model stops requesting tools.

use crate::error::{AgentryError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::tools::LlmTool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on complete/tool-call rounds for a single `generate` call.
/// Stops a model that keeps asking for tools from looping forever.
const MAX_TOOL_ROUNDS: usize = 10;

/// Main interface for LLM interactions
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
        }
    }

    /// The model identifier this broker prompts
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a text response from the LLM.
    ///
    /// When the model requests tool calls and `tools` is provided, each call
    /// is executed in order, its output is appended to the conversation as a
    /// tool message, and the model is prompted again with the enriched
    /// history. The loop ends when the model answers in plain text.
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        let config = config.unwrap_or_default();
        let mut history = messages.to_vec();

        for round in 0..MAX_TOOL_ROUNDS {
            let response = self.gateway.complete(&self.model, &history, tools, &config).await?;

            if response.tool_calls.is_empty() {
                return Ok(response.content.unwrap_or_default());
            }

            let Some(tools) = tools else {
                warn!("Model requested tool calls but no tools were provided");
                return Ok(response.content.unwrap_or_default());
            };

            debug!(round, count = response.tool_calls.len(), "Executing tool calls");
            self.run_tool_calls(&mut history, &response, tools).await?;
        }

        Err(AgentryError::ToolError(format!(
            "tool loop did not settle within {} rounds",
            MAX_TOOL_ROUNDS
        )))
    }

    /// Execute every requested tool call and append the exchange to `history`.
    async fn run_tool_calls(
        &self,
        history: &mut Vec<LlmMessage>,
        response: &LlmGatewayResponse,
        tools: &[Box<dyn LlmTool>],
    ) -> Result<()> {
        history.push(LlmMessage::assistant_tool_calls(response.tool_calls.clone()));

        for tool_call in &response.tool_calls {
            let content = match tools.iter().find(|t| t.matches(&tool_call.name)) {
                Some(tool) => {
                    info!("Executing tool: {}", tool_call.name);
                    let output = tool.run(&tool_call.arguments).await?;
                    serde_json::to_string(&output)?
                }
                None => {
                    // Let the model recover rather than aborting the run
                    warn!("Tool not found: {}", tool_call.name);
                    format!("no tool named '{}' is available", tool_call.name)
                }
            };

            history.push(LlmMessage::tool_result(tool_call.clone(), content));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::{LlmToolCall, MessageRole};
    use crate::llm::tools::{FunctionDescriptor, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockGateway {
        responses: Vec<LlmGatewayResponse>,
        call_count: Mutex<usize>,
        seen_messages: Mutex<Vec<Vec<LlmMessage>>>,
    }

    impl MockGateway {
        fn new(responses: Vec<LlmGatewayResponse>) -> Self {
            Self {
                responses,
                call_count: Mutex::new(0),
                seen_messages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        async fn complete(
            &self,
            _model: &str,
            messages: &[LlmMessage],
            _tools: Option<&[Box<dyn LlmTool>]>,
            _config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            self.seen_messages.lock().unwrap().push(messages.to_vec());

            let mut count = self.call_count.lock().unwrap();
            let idx = *count;
            *count += 1;

            if idx < self.responses.len() {
                Ok(self.responses[idx].clone())
            } else {
                Ok(LlmGatewayResponse {
                    content: Some("default response".to_string()),
                    tool_calls: vec![],
                })
            }
        }

        async fn get_available_models(&self) -> Result<Vec<String>> {
            Ok(vec!["test-model".to_string()])
        }
    }

    #[derive(Clone)]
    struct MockTool {
        name: String,
        result: Value,
    }

    #[async_trait]
    impl LlmTool for MockTool {
        async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Ok(self.result.clone())
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                r#type: "function".to_string(),
                function: FunctionDescriptor {
                    name: self.name.clone(),
                    description: "A mock tool".to_string(),
                    parameters: serde_json::json!({}),
                },
            }
        }

        fn clone_box(&self) -> Box<dyn LlmTool> {
            Box::new(self.clone())
        }
    }

    fn tool_call(name: &str) -> LlmToolCall {
        LlmToolCall {
            id: Some("call_1".to_string()),
            name: name.to_string(),
            arguments: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_broker_new() {
        let gateway = Arc::new(MockGateway::new(vec![]));
        let broker = LlmBroker::new("test-model", gateway);
        assert_eq!(broker.model(), "test-model");
    }

    #[tokio::test]
    async fn test_generate_simple_response() {
        let response = LlmGatewayResponse {
            content: Some("Hello, World!".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("Hi")];
        let result = broker.generate(&messages, None, None).await.unwrap();

        assert_eq!(result, "Hello, World!");
    }

    #[tokio::test]
    async fn test_generate_empty_response_content() {
        let response = LlmGatewayResponse {
            content: None,
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("Hi")];
        let result = broker.generate(&messages, None, None).await.unwrap();

        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_generate_with_tool_call() {
        let first_response = LlmGatewayResponse {
            content: None,
            tool_calls: vec![tool_call("test_tool")],
        };
        let second_response = LlmGatewayResponse {
            content: Some("After tool execution".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![first_response, second_response]));
        let broker = LlmBroker::new("test-model", gateway.clone());

        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(MockTool {
            name: "test_tool".to_string(),
            result: serde_json::json!({"result": "success"}),
        })];

        let messages = vec![LlmMessage::user("Use the tool")];
        let result = broker.generate(&messages, Some(&tools), None).await.unwrap();

        assert_eq!(result, "After tool execution");

        // Second gateway call must have seen the tool exchange appended
        let seen = gateway.seen_messages.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, MessageRole::Assistant);
        assert!(second[1].tool_calls.is_some());
        assert_eq!(second[2].role, MessageRole::Tool);
        assert!(second[2].content.as_ref().unwrap().contains("success"));
    }

    #[tokio::test]
    async fn test_generate_with_tool_call_no_tools_provided() {
        let response = LlmGatewayResponse {
            content: Some("fallback".to_string()),
            tool_calls: vec![tool_call("test_tool")],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![LlmMessage::user("Use the tool")];
        let result = broker.generate(&messages, None, None).await.unwrap();

        assert_eq!(result, "fallback");
    }

    #[tokio::test]
    async fn test_generate_with_unknown_tool_name() {
        let first_response = LlmGatewayResponse {
            content: None,
            tool_calls: vec![tool_call("does_not_exist")],
        };
        let second_response = LlmGatewayResponse {
            content: Some("recovered".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![first_response, second_response]));
        let broker = LlmBroker::new("test-model", gateway.clone());

        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(MockTool {
            name: "real_tool".to_string(),
            result: serde_json::json!(null),
        })];

        let messages = vec![LlmMessage::user("Use the tool")];
        let result = broker.generate(&messages, Some(&tools), None).await.unwrap();

        assert_eq!(result, "recovered");

        // The unknown tool name is reported back to the model
        let seen = gateway.seen_messages.lock().unwrap();
        let tool_msg = &seen[1][2];
        assert!(tool_msg.content.as_ref().unwrap().contains("does_not_exist"));
    }

    #[tokio::test]
    async fn test_generate_tool_loop_bound() {
        // Gateway that always asks for another tool call
        struct LoopingGateway;

        #[async_trait]
        impl LlmGateway for LoopingGateway {
            async fn complete(
                &self,
                _model: &str,
                _messages: &[LlmMessage],
                _tools: Option<&[Box<dyn LlmTool>]>,
                _config: &CompletionConfig,
            ) -> Result<LlmGatewayResponse> {
                Ok(LlmGatewayResponse {
                    content: None,
                    tool_calls: vec![LlmToolCall {
                        id: None,
                        name: "test_tool".to_string(),
                        arguments: HashMap::new(),
                    }],
                })
            }

            async fn get_available_models(&self) -> Result<Vec<String>> {
                Ok(vec![])
            }
        }

        let broker = LlmBroker::new("test-model", Arc::new(LoopingGateway));
        let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(MockTool {
            name: "test_tool".to_string(),
            result: serde_json::json!("ok"),
        })];

        let messages = vec![LlmMessage::user("loop")];
        let result = broker.generate(&messages, Some(&tools), None).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("did not settle"));
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let response = LlmGatewayResponse {
            content: Some("Response to conversation".to_string()),
            tool_calls: vec![],
        };

        let gateway = Arc::new(MockGateway::new(vec![response]));
        let broker = LlmBroker::new("test-model", gateway);

        let messages = vec![
            LlmMessage::system("You are helpful"),
            LlmMessage::user("First message"),
            LlmMessage::assistant("First response"),
            LlmMessage::user("Second message"),
        ];

        let result = broker.generate(&messages, None, None).await.unwrap();
        assert_eq!(result, "Response to conversation");
    }
}
