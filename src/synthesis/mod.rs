//! 结果综合：把工具结果合成一段回答，或在没有工具结果时直接对话
//!
//! 综合路径的回答前面加一行由程序生成的 `[Tools used: ...]`（按首次出现顺序去重）。
//! LLM 调用失败不重试，以 `AgentError::Synthesis` 交给调用方。

use std::sync::Arc;

use crate::core::AgentError;
use crate::dispatch::ToolResult;
use crate::llm::LlmClient;
use crate::memory::{Message, Turn};
use crate::tools::ToolKind;

/// 结果中出现过的工具名，按首次出现顺序去重
pub fn tools_used(results: &[ToolResult]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for r in results {
        if !seen.contains(&r.tool) {
            seen.push(r.tool.clone());
        }
    }
    seen
}

fn category(tool: &str) -> &str {
    ToolKind::from_name(tool).map(|k| k.category()).unwrap_or(tool)
}

pub fn build_tool_prompt(utterance: &str, results: &[ToolResult]) -> String {
    let blocks: Vec<String> = results
        .iter()
        .map(|r| format!("[{}: {}]\n{}", category(&r.tool), r.display, r.text))
        .collect();
    format!(
        "User request: {}\nBelow are the results from several tools.\n{}\n\n\
Combine the results of all tools and give an in-depth analysis in 3 to 7 lines: key insights, trends, a summary, \
how the results relate to each other and what they mean. Answer in the language of the user request.",
        utterance,
        blocks.join("\n")
    )
}

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn synthesize_with_tools(
        &self,
        utterance: &str,
        results: &[ToolResult],
    ) -> Result<String, AgentError> {
        let prompt = build_tool_prompt(utterance, results);
        let summary = self
            .llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::Synthesis)?;
        Ok(format!(
            "[Tools used: {}]\n\n{}",
            tools_used(results).join(", "),
            summary
        ))
    }

    /// 回放此前的全部对话，再加上本次发言
    pub async fn synthesize_direct(
        &self,
        utterance: &str,
        history: &[Turn],
    ) -> Result<String, AgentError> {
        let mut messages: Vec<Message> = history.iter().map(Message::from).collect();
        messages.push(Message::user(utterance));
        self.llm
            .complete(&messages)
            .await
            .map_err(AgentError::Synthesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ResultStatus;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::memory::Role;
    use serde_json::Map;

    fn result(tool: &str, display: &str, text: &str) -> ToolResult {
        ToolResult {
            tool: tool.to_string(),
            parameters: Map::new(),
            display: display.to_string(),
            text: text.to_string(),
            media: None,
            status: ResultStatus::Success,
        }
    }

    #[test]
    fn test_tools_used_first_seen_without_duplicates() {
        let results = vec![
            result("news", "Apple", "a"),
            result("market_data", "AAPL", "b"),
            result("news", "Tesla", "c"),
        ];
        assert_eq!(tools_used(&results), vec!["news", "market_data"]);
    }

    #[test]
    fn test_prompt_labels_each_block() {
        let prompt = build_tool_prompt(
            "AAPL and news",
            &[
                result("market_data", "AAPL", "table"),
                result("weather", "{\"city\":\"Seoul\"}", "sunny"),
            ],
        );
        assert!(prompt.starts_with("User request: AAPL and news\n"));
        assert!(prompt.contains("[Market data: AAPL]\ntable\n[weather: {\"city\":\"Seoul\"}]\nsunny"));
        assert!(prompt.contains("3 to 7 lines"));
    }

    #[tokio::test]
    async fn test_header_prefixes_model_output() {
        let mock = Arc::new(MockLlmClient::with_responses(["Apple is rising."]));
        let synth = Synthesizer::new(mock.clone());
        let answer = synth
            .synthesize_with_tools(
                "q",
                &[
                    result("news", "Apple", "a"),
                    result("web_search", "AI", "b"),
                    result("news", "Apple", "c"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(answer, "[Tools used: news, web_search]\n\nApple is rising.");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_direct_replays_history() {
        let mock = Arc::new(MockLlmClient::with_responses(["Hi again!"]));
        let synth = Synthesizer::new(mock.clone());
        let history = vec![
            Turn::user("show AAPL"),
            Turn::assistant("[Tools used: market_data]\n\nAAPL is up."),
        ];
        let answer = synth.synthesize_direct("hello", &history).await.unwrap();
        assert_eq!(answer, "Hi again!");

        let sent = &mock.requests()[0];
        let roles: Vec<Role> = sent.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(sent[1].content, "[Tools used: market_data]\n\nAAPL is up.");
        assert_eq!(sent[2].content, "hello");
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error(LlmError::Request("503".into()));
        let synth = Synthesizer::new(mock);
        let err = synth
            .synthesize_with_tools("q", &[result("news", "x", "y")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Synthesis(LlmError::Request(_))));
    }
}
