//! Keyword-routed assistant over three executors.
//!
//! Builds SQL, search, and chat executors on top of an Azure OpenAI
//! deployment, then routes a few sample prompts through the keyword router.
//! Azure credentials come from the environment (or a .env file).

use agentry::executor::AgentExecutor;
use agentry::llm::tools::{CalculatorTool, LlmTool, TableQueryTool, WebSearchTool};
use agentry::llm::LlmBroker;
use agentry::llm::gateways::AzureOpenAIGateway;
use agentry::questdb::QuestDbBridge;
use agentry::router::KeywordRouter;
use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn broker(gateway: &Arc<AzureOpenAIGateway>) -> LlmBroker {
    // Azure routes by deployment; the model id is informational only
    LlmBroker::new(gateway.deployment().to_string(), gateway.clone())
}

fn sql_executor(gateway: &Arc<AzureOpenAIGateway>) -> AgentExecutor {
    let bridge = QuestDbBridge::new();
    let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(TableQueryTool::new(
        "employees",
        "employee records with name, department, and join date",
        bridge,
    ))];

    AgentExecutor::builder(broker(gateway))
        .system_prompt(
            "You are a SQL assistant. Translate the user's request into a query \
             and run it with the table tools when data is needed.",
        )
        .tools(tools)
        .temperature(0.0)
        .build()
}

fn search_executor(gateway: &Arc<AzureOpenAIGateway>) -> AgentExecutor {
    let tools: Vec<Box<dyn LlmTool>> =
        vec![Box::new(WebSearchTool::new()), Box::new(CalculatorTool::new())];

    AgentExecutor::builder(broker(gateway))
        .system_prompt(
            "You are a research assistant. Use web search for current information \
             and the calculator for any arithmetic.",
        )
        .tools(tools)
        .temperature(0.0)
        .build()
}

fn chat_executor(gateway: &Arc<AzureOpenAIGateway>) -> AgentExecutor {
    AgentExecutor::builder(broker(gateway))
        .system_prompt("You are a friendly conversational assistant.")
        .temperature(0.0)
        .build()
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

    let gateway = Arc::new(AzureOpenAIGateway::from_env()?);

    let mut router = KeywordRouter::new(
        sql_executor(&gateway),
        search_executor(&gateway),
        chat_executor(&gateway),
    );

    let prompts = [
        "Hi, how are you today?",
        "Search the latest in AI research",
        "Convert to SQL: list all employees joined after 2022",
    ];

    for prompt in prompts {
        println!("\nYou: {}", prompt);

        let response = router.route(prompt).await?;
        println!("\nAgent Response:\n{}", response);
    }

    Ok(())
}
