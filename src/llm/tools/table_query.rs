//! Per-table SQL query tools backed by the QuestDB bridge.
//!
//! [`TableQueryTool::new`] is the tool factory: given a table name and a
//! human-readable description it produces a tool whose input is a SQL WHERE
//! clause condition. The condition is interpolated into
//! `SELECT * FROM <table> WHERE <condition>` with no escaping, exactly as
//! the backing endpoint expects it. That makes the condition an injection
//! vector by construction; the tool exists to let a model query known
//! tables, not to guard a database.

use crate::error::{AgentryError, Result};
use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
use crate::questdb::QuestDbBridge;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

/// A tool that queries one database table with a caller-supplied WHERE clause
#[derive(Clone)]
pub struct TableQueryTool {
    table: String,
    description: String,
    bridge: QuestDbBridge,
}

impl TableQueryTool {
    /// Create a query tool for `table`.
    ///
    /// `description` is what the model sees, e.g.
    /// `"fresh vegetables and fruits with prices and stock"`.
    pub fn new(
        table: impl Into<String>,
        description: impl Into<String>,
        bridge: QuestDbBridge,
    ) -> Self {
        Self {
            table: table.into(),
            description: description.into(),
            bridge,
        }
    }

    /// The fixed SQL template with the condition interpolated, unescaped
    fn build_query(&self, condition: &str) -> String {
        format!("SELECT * FROM {} WHERE {}", self.table, condition)
    }

    fn tool_name(&self) -> String {
        format!("query_{}_table", self.table)
    }
}

#[async_trait]
impl LlmTool for TableQueryTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let condition = args.get("condition").and_then(|v| v.as_str()).ok_or_else(|| {
            AgentryError::InvalidArgument("condition parameter is required".to_string())
        })?;

        if condition.trim().is_empty() {
            return Err(AgentryError::InvalidArgument(
                "condition parameter cannot be empty".to_string(),
            ));
        }

        let sql = self.build_query(condition);
        let body = self.bridge.query(&sql).await?;

        Ok(json!(body))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: self.tool_name(),
                description: format!(
                    "Use this tool to find {}. Input should be a SQL WHERE clause condition.",
                    self.description
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "condition": {
                            "type": "string",
                            "description": "A SQL WHERE clause condition, e.g. \"price < 5.0\""
                        }
                    },
                    "required": ["condition"]
                }),
            },
        }
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}
