//! 意图解析：把一句话交给 LLM，得到按顺序排列的工具意图
//!
//! 解析永远不会向外失败：回复无法解析时整体重试（默认共 2 次），仍失败则返回 `[{"tool": "none"}]`。
//! 模型同时给出 none 与真实工具时原样返回，由分发器跳过 none。

pub mod catalog;
pub mod extract;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::tools::ToolRegistry;

pub use extract::extract_json_array;

/// 表示「不需要工具」的哨兵工具名
pub const NONE_TOOL: &str = "none";

/// 一条工具意图：工具名 + 平铺的参数字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolIntent {
    pub tool: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl ToolIntent {
    pub fn new(tool: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            parameters,
        }
    }

    pub fn none() -> Self {
        Self::new(NONE_TOOL, Map::new())
    }

    pub fn is_none(&self) -> bool {
        self.tool == NONE_TOOL
    }
}

/// 解析模型回复：必须是数组；缺少字符串 `tool` 的元素被丢弃，没有剩余意图时视为不需要工具
pub fn parse_intents(raw: &str) -> Result<Vec<ToolIntent>, AgentError> {
    let json = extract_json_array(raw.trim());
    let value: Value =
        serde_json::from_str(json).map_err(|e| AgentError::ResolutionParse(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(AgentError::ResolutionParse("expected a JSON array".to_string()));
    };

    let mut intents = Vec::with_capacity(items.len());
    for item in items {
        let mut fields = match item {
            Value::Object(fields) => fields,
            other => {
                tracing::debug!(element = %other, "dropping non-object intent");
                continue;
            }
        };
        match fields.remove("tool") {
            Some(Value::String(tool)) => intents.push(ToolIntent::new(tool, fields)),
            other => {
                tracing::debug!(tool = ?other, "dropping intent without a tool name");
            }
        }
    }
    if intents.is_empty() {
        return Ok(vec![ToolIntent::none()]);
    }
    Ok(intents)
}

pub struct IntentResolver {
    llm: Arc<dyn LlmClient>,
    catalog: String,
    max_attempts: usize,
}

impl IntentResolver {
    pub fn new(llm: Arc<dyn LlmClient>, registry: &ToolRegistry, max_attempts: usize) -> Self {
        Self {
            llm,
            catalog: catalog::build_catalog(registry),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn prompt(&self, utterance: &str) -> String {
        format!(
            "{}\nUser request:\n{}\n\nAnalyse the request and decide which tools to call with which parameters. \
Return only a JSON array like the example above; if no tool is needed return [{{\"tool\": \"none\"}}].",
            self.catalog, utterance
        )
    }

    /// 返回非空的意图序列
    pub async fn resolve(&self, utterance: &str) -> Vec<ToolIntent> {
        let messages = [Message::user(self.prompt(utterance))];
        for attempt in 1..=self.max_attempts {
            let raw = match self.llm.complete(&messages).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "intent resolution call failed");
                    continue;
                }
            };
            match parse_intents(&raw) {
                Ok(intents) => {
                    tracing::info!(
                        attempt,
                        tools = ?intents.iter().map(|i| i.tool.as_str()).collect::<Vec<_>>(),
                        "intents resolved"
                    );
                    return intents;
                }
                Err(e) => {
                    let preview: String = raw.chars().take(200).collect();
                    tracing::warn!(attempt, error = %e, raw = %preview, "unparsable intent reply");
                }
            }
        }
        tracing::warn!(attempts = self.max_attempts, "falling back to no tool");
        vec![ToolIntent::none()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};
    use serde_json::json;

    fn resolver(mock: &Arc<MockLlmClient>) -> IntentResolver {
        IntentResolver::new(mock.clone(), &ToolRegistry::new(), 2)
    }

    #[tokio::test]
    async fn test_valid_array_is_returned_unchanged() {
        let mock = Arc::new(MockLlmClient::with_responses([
            r#"[{"tool":"market_data","ticker":"AAPL","ma_window":20,"chart":true},{"tool":"news","keyword":"Apple"}]"#,
        ]));
        let intents = resolver(&mock).resolve("AAPL stock and news").await;
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].tool, "market_data");
        assert_eq!(intents[0].parameters.get("ticker"), Some(&json!("AAPL")));
        assert_eq!(intents[0].parameters.get("ma_window"), Some(&json!(20)));
        assert_eq!(intents[1].tool, "news");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fenced_reply_is_extracted() {
        let mock = Arc::new(MockLlmClient::with_responses([
            "Here you go:\n```json\n[{\"tool\": \"none\"}]\n```",
        ]));
        let intents = resolver(&mock).resolve("hello").await;
        assert_eq!(intents, vec![ToolIntent::none()]);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let mock = Arc::new(MockLlmClient::with_responses([
            "I think you want the news",
            r#"[{"tool":"news","keyword":"Tesla"}]"#,
        ]));
        let intents = resolver(&mock).resolve("tesla news").await;
        assert_eq!(intents[0].tool, "news");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_all_attempts_fail_yields_none() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_response("not json");
        mock.push_error(LlmError::Request("timeout".into()));
        mock.push_response(r#"[{"tool":"news"}]"#);
        let intents = resolver(&mock).resolve("anything").await;
        assert_eq!(intents, vec![ToolIntent::none()]);
        // 预算只有 2 次，第三条回复不会被取走
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_none_mixed_with_tools_passes_through() {
        let mock = Arc::new(MockLlmClient::with_responses([
            r#"[{"tool":"none"},{"tool":"deep_search","query":"rust"}]"#,
        ]));
        let intents = resolver(&mock).resolve("rust").await;
        assert_eq!(intents.len(), 2);
        assert!(intents[0].is_none());
        assert_eq!(intents[1].tool, "deep_search");
    }

    #[test]
    fn test_parse_rejects_non_arrays() {
        assert!(parse_intents(r#"{"tool":"news"}"#).is_err());
        assert!(parse_intents(r#""news""#).is_err());
        assert!(parse_intents("not json").is_err());
        assert_eq!(parse_intents("[]").unwrap(), vec![ToolIntent::none()]);
    }

    #[test]
    fn test_parse_drops_elements_without_tool() {
        let intents =
            parse_intents(r#"[{"tool":"news","keyword":"Apple"},{"keyword":"x"},{"tool":3},"web"]"#)
                .unwrap();
        let mut params = Map::new();
        params.insert("keyword".to_string(), json!("Apple"));
        assert_eq!(intents, vec![ToolIntent::new("news", params)]);

        // 全部被丢弃时退化为 none
        assert_eq!(
            parse_intents(r#"[{"keyword":"Apple"}]"#).unwrap(),
            vec![ToolIntent::none()]
        );
    }

    #[tokio::test]
    async fn test_stray_element_does_not_force_retry() {
        let mock = Arc::new(MockLlmClient::with_responses([
            r#"[{"tool":"news","keyword":"Apple"},{"keyword":"x"}]"#,
        ]));
        let intents = resolver(&mock).resolve("Apple news").await;
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].tool, "news");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_two_arrays_first_wins() {
        let raw = r#"Example: [{"tool":"none"}]. Answer: [{"tool":"news","keyword":"x"}]"#;
        assert_eq!(parse_intents(raw).unwrap(), vec![ToolIntent::none()]);
    }

    #[test]
    fn test_prompt_embeds_utterance() {
        let mock = Arc::new(MockLlmClient::new());
        let prompt = resolver(&mock).prompt("삼성전자 주가");
        assert!(prompt.contains("User request:\n삼성전자 주가"));
        assert!(prompt.contains(r#"[{"tool": "none"}]"#));
    }
}
