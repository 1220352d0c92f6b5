//! Keyword routing over pre-built agent executors.
//!
//! Requests are dispatched by substring cues in the raw user text: SQL cues
//! first, then search cues, else the conversational default. First matching
//! category wins, in source order. No scoring, no ambiguity resolution.
//! Substring matching is fragile by nature ("find" inside "finder" matches
//! too); that is the documented contract, not something this module tries
//! to outsmart.

use crate::error::Result;
use crate::executor::AgentExecutor;
use tracing::info;

const SQL_CUES: [&str; 3] = ["sql", "convert", "query"];
const SEARCH_CUES: [&str; 3] = ["search", "latest", "find"];

/// The downstream path a request is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Sql,
    Search,
    Chat,
}

impl Route {
    /// Classify free text by substring cues, case-insensitively.
    ///
    /// SQL cues take precedence over search cues; anything unmatched is chat.
    pub fn classify(input: &str) -> Self {
        let lower = input.to_lowercase();

        if SQL_CUES.iter().any(|cue| lower.contains(cue)) {
            Route::Sql
        } else if SEARCH_CUES.iter().any(|cue| lower.contains(cue)) {
            Route::Search
        } else {
            Route::Chat
        }
    }
}

/// Routes user requests to one of three pre-built executors
pub struct KeywordRouter {
    sql: AgentExecutor,
    search: AgentExecutor,
    chat: AgentExecutor,
}

impl KeywordRouter {
    /// Create a router over the three downstream executors
    pub fn new(sql: AgentExecutor, search: AgentExecutor, chat: AgentExecutor) -> Self {
        Self { sql, search, chat }
    }

    /// Dispatch the request to the matching executor and return its answer.
    ///
    /// Downstream errors propagate unchanged.
    pub async fn route(&mut self, input: &str) -> Result<String> {
        let route = Route::classify(input);
        info!(?route, "Routing request");

        match route {
            Route::Sql => self.sql.invoke(input).await,
            Route::Search => self.search.invoke(input).await,
            Route::Chat => self.chat.invoke(input).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::broker::LlmBroker;
    use crate::llm::gateway::{CompletionConfig, LlmGateway};
    use crate::llm::models::{LlmGatewayResponse, LlmMessage};
    use crate::llm::tools::LlmTool;
    use async_trait::async_trait;
    use std::sync::Arc;

    #[test]
    fn test_sql_cues() {
        assert_eq!(Route::classify("Convert to SQL: list employees"), Route::Sql);
        assert_eq!(Route::classify("write a sql statement"), Route::Sql);
        assert_eq!(Route::classify("run this QUERY for me"), Route::Sql);
    }

    #[test]
    fn test_search_cues() {
        assert_eq!(Route::classify("Search the latest AI news"), Route::Search);
        assert_eq!(Route::classify("what is the LATEST release?"), Route::Search);
        assert_eq!(Route::classify("find me a restaurant"), Route::Search);
    }

    #[test]
    fn test_chat_default() {
        assert_eq!(Route::classify("Hi there"), Route::Chat);
        assert_eq!(Route::classify(""), Route::Chat);
        assert_eq!(Route::classify("tell me a joke"), Route::Chat);
    }

    #[test]
    fn test_sql_takes_precedence_over_search() {
        // Contains both "query" and "search"; SQL is checked first
        assert_eq!(Route::classify("search for a query example"), Route::Sql);
        assert_eq!(Route::classify("convert my latest notes"), Route::Sql);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(Route::classify("CONVERT this"), Route::Sql);
        assert_eq!(Route::classify("SeArCh this"), Route::Search);
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // "find" inside "finder" still routes to search; that is the contract
        assert_eq!(Route::classify("open the finder"), Route::Search);
    }

    struct FixedGateway {
        answer: String,
    }

    #[async_trait]
    impl LlmGateway for FixedGateway {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[LlmMessage],
            _tools: Option<&[Box<dyn LlmTool>]>,
            _config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            Ok(LlmGatewayResponse {
                content: Some(self.answer.clone()),
                tool_calls: vec![],
            })
        }

        async fn get_available_models(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn executor_answering(answer: &str) -> AgentExecutor {
        let gateway = Arc::new(FixedGateway {
            answer: answer.to_string(),
        });
        AgentExecutor::new(LlmBroker::new("test-model", gateway))
    }

    fn test_router() -> KeywordRouter {
        KeywordRouter::new(
            executor_answering("from sql executor"),
            executor_answering("from search executor"),
            executor_answering("from chat executor"),
        )
    }

    #[tokio::test]
    async fn test_route_dispatches_to_sql() {
        let mut router = test_router();
        let answer = router.route("Convert to SQL: list all employees joined after 2022").await.unwrap();
        assert_eq!(answer, "from sql executor");
    }

    #[tokio::test]
    async fn test_route_dispatches_to_search() {
        let mut router = test_router();
        let answer = router.route("Search the latest in AI research").await.unwrap();
        assert_eq!(answer, "from search executor");
    }

    #[tokio::test]
    async fn test_route_dispatches_to_chat() {
        let mut router = test_router();
        let answer = router.route("Hi, how are you today?").await.unwrap();
        assert_eq!(answer, "from chat executor");
    }

    #[tokio::test]
    async fn test_route_keeps_per_executor_memory() {
        let mut router = test_router();

        router.route("Hi there").await.unwrap();
        router.route("Search the latest news").await.unwrap();
        router.route("How are you?").await.unwrap();

        // Two chat exchanges, one search exchange, none for sql
        assert_eq!(router.chat.turn_count(), 2);
        assert_eq!(router.search.turn_count(), 1);
        assert_eq!(router.sql.turn_count(), 0);
    }
}
