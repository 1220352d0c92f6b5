pub mod azure_openai;
pub mod ollama;

pub use azure_openai::{AzureOpenAIConfig, AzureOpenAIGateway};
pub use ollama::{OllamaConfig, OllamaGateway};
