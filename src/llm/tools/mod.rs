pub mod calculator;
pub mod table_query;
mod tool;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use table_query::TableQueryTool;
pub use tool::{FunctionDescriptor, LlmTool, ToolDescriptor};
pub use web_search::{SearchResult, WebSearchTool};
