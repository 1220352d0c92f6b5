pub mod error;
pub mod executor;
pub mod llm;
pub mod questdb;
pub mod router;

pub use error::{AgentryError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{AgentryError, Result};
    pub use crate::executor::AgentExecutor;
    pub use crate::llm::gateways::{AzureOpenAIGateway, OllamaGateway};
    pub use crate::llm::tools::{
        CalculatorTool, FunctionDescriptor, LlmTool, TableQueryTool, ToolDescriptor, WebSearchTool,
    };
    pub use crate::llm::{CompletionConfig, LlmBroker, LlmGateway, LlmMessage, MessageRole};
    pub use crate::questdb::QuestDbBridge;
    pub use crate::router::{KeywordRouter, Route};
}
