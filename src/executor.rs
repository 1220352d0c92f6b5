//! Agent executors with conversation memory.
//!
//! An [`AgentExecutor`] owns a broker, an optional tool set, and the
//! conversation buffer for one session. Each `invoke` appends the user turn,
//! lets the broker work through any tool calls, appends the assistant's
//! answer, and returns it. The buffer lives for the life of the executor;
//! nothing is persisted and nothing is evicted.

use crate::error::Result;
use crate::llm::broker::LlmBroker;
use crate::llm::gateway::CompletionConfig;
use crate::llm::models::{LlmMessage, MessageRole};
use crate::llm::tools::LlmTool;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A tool-calling agent session with in-memory conversation history
pub struct AgentExecutor {
    broker: LlmBroker,
    tools: Option<Vec<Box<dyn LlmTool>>>,
    messages: Vec<LlmMessage>,
    temperature: f32,
}

impl AgentExecutor {
    /// Create an executor with default settings
    pub fn new(broker: LlmBroker) -> Self {
        Self::builder(broker).build()
    }

    /// Create an executor builder for custom configuration.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let executor = AgentExecutor::builder(broker)
    ///     .system_prompt("You are an expert data agent querying a QuestDB database.")
    ///     .tools(tools)
    ///     .temperature(0.1)
    ///     .build();
    /// ```
    pub fn builder(broker: LlmBroker) -> AgentExecutorBuilder {
        AgentExecutorBuilder::new(broker)
    }

    /// Send one user request through the agent and return the final answer.
    ///
    /// Tool-call exchanges happen inside the broker; the session buffer
    /// keeps the user and assistant turns.
    pub async fn invoke(&mut self, input: &str) -> Result<String> {
        self.messages.push(LlmMessage::user(input));

        let config = CompletionConfig::with_temperature(self.temperature);
        let response = self
            .broker
            .generate(&self.messages, self.tools.as_deref(), Some(config))
            .await?;

        self.messages.push(LlmMessage::assistant(&response));

        Ok(response)
    }

    /// The conversation history accumulated so far
    pub fn messages(&self) -> &[LlmMessage] {
        &self.messages
    }

    /// Number of user/assistant exchanges in the buffer
    pub fn turn_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == MessageRole::User).count()
    }
}

/// Builder for constructing an [`AgentExecutor`]
pub struct AgentExecutorBuilder {
    broker: LlmBroker,
    system_prompt: String,
    tools: Option<Vec<Box<dyn LlmTool>>>,
    temperature: f32,
}

impl AgentExecutorBuilder {
    fn new(broker: LlmBroker) -> Self {
        Self {
            broker,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tools: None,
            temperature: 1.0,
        }
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the tools available to the agent
    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the sampling temperature (default: 1.0)
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the executor, seeding the buffer with the system prompt
    pub fn build(self) -> AgentExecutor {
        AgentExecutor {
            broker: self.broker,
            tools: self.tools,
            messages: vec![LlmMessage::system(self.system_prompt)],
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::gateway::LlmGateway;
    use crate::llm::models::LlmGatewayResponse;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct ScriptedGateway {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[LlmMessage],
            _tools: Option<&[Box<dyn LlmTool>]>,
            _config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            let mut responses = self.responses.lock().unwrap();
            let content = if responses.is_empty() {
                "done".to_string()
            } else {
                responses.remove(0)
            };

            Ok(LlmGatewayResponse {
                content: Some(content),
                tool_calls: vec![],
            })
        }

        async fn get_available_models(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn executor_with(responses: Vec<&str>) -> AgentExecutor {
        let gateway = Arc::new(ScriptedGateway::new(responses));
        let broker = LlmBroker::new("test-model", gateway);
        AgentExecutor::new(broker)
    }

    #[tokio::test]
    async fn test_invoke_returns_answer() {
        let mut executor = executor_with(vec!["Hello!"]);

        let answer = executor.invoke("Hi, how are you today?").await.unwrap();
        assert_eq!(answer, "Hello!");
    }

    #[tokio::test]
    async fn test_memory_accumulates_turns() {
        let mut executor = executor_with(vec!["first answer", "second answer"]);

        executor.invoke("first question").await.unwrap();
        executor.invoke("second question").await.unwrap();

        // system + (user, assistant) x 2
        let messages = executor.messages();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content.as_deref(), Some("first question"));
        assert_eq!(messages[2].content.as_deref(), Some("first answer"));
        assert_eq!(messages[3].content.as_deref(), Some("second question"));
        assert_eq!(messages[4].content.as_deref(), Some("second answer"));

        assert_eq!(executor.turn_count(), 2);
    }

    #[tokio::test]
    async fn test_builder_system_prompt() {
        let gateway = Arc::new(ScriptedGateway::new(vec!["ok"]));
        let broker = LlmBroker::new("test-model", gateway);

        let executor = AgentExecutor::builder(broker)
            .system_prompt("You are an expert data agent.")
            .temperature(0.1)
            .build();

        assert_eq!(
            executor.messages()[0].content.as_deref(),
            Some("You are an expert data agent.")
        );
        assert_eq!(executor.temperature, 0.1);
    }

    #[tokio::test]
    async fn test_default_system_prompt() {
        let executor = executor_with(vec![]);
        assert_eq!(
            executor.messages()[0].content.as_deref(),
            Some(DEFAULT_SYSTEM_PROMPT)
        );
    }
}
