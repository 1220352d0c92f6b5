//! Multi-hop supermarket queries against QuestDB.
//!
//! Wires an Ollama-hosted model to three per-table query tools and a
//! conversation-memory executor, then runs a couple of questions that need
//! more than one table to answer.

use agentry::executor::AgentExecutor;
use agentry::llm::tools::{LlmTool, TableQueryTool};
use agentry::llm::LlmBroker;
use agentry::llm::gateways::OllamaGateway;
use agentry::questdb::QuestDbBridge;
use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SYSTEM_PROMPT: &str = "You are an expert data agent answering questions about a \
supermarket's inventory stored in QuestDB. Use the table query tools to fetch the data \
you need; a question may require querying several tables before you can answer. Only \
answer once you have all the needed data.";

fn table_tools(bridge: &QuestDbBridge) -> Vec<Box<dyn LlmTool>> {
    let tables = [
        ("electronics", "phones, laptops, TVs with price and quantity"),
        ("food", "packaged food items, snacks, processed foods with prices"),
        ("vegetables", "fresh vegetables and fruits with prices and stock"),
    ];

    tables
        .into_iter()
        .map(|(table, description)| {
            Box::new(TableQueryTool::new(table, description, bridge.clone())) as Box<dyn LlmTool>
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "agentry=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let gateway = Arc::new(OllamaGateway::new());
    let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.1".to_string());
    let broker = LlmBroker::new(model, gateway);

    let bridge = QuestDbBridge::new();

    let mut executor = AgentExecutor::builder(broker)
        .system_prompt(SYSTEM_PROMPT)
        .tools(table_tools(&bridge))
        .temperature(0.1)
        .build();

    let queries = [
        "Find fruits that cost less than the average price of electronics",
        "Get me vegetables cheaper than the cheapest phone available",
    ];

    for (i, query) in queries.iter().enumerate() {
        println!("\n----- Query {} -----", i + 1);
        println!("You: {}", query);

        let response = executor.invoke(query).await?;
        println!("\n[Agent Final Response]:\n{}", response);
    }

    Ok(())
}
