//! 意图解析 prompt 中的能力目录：工具名、描述、参数 schema、示例
//!
//! 目录由注册表生成，只包含实际注册的工具；示例覆盖常见的参数写法。

use std::fmt::Write as _;

use crate::tools::{ToolKind, ToolRegistry};

fn examples(kind: ToolKind) -> &'static [&'static str] {
    match kind {
        ToolKind::MarketData => &[
            r#"{"tool": "market_data", "ticker": "AAPL", "start": "2024-01-01", "end": "2024-12-31", "interval": "1d", "ma_window": 20, "rsi_window": 14, "summary": true, "chart": true}"#,
            r#"{"tool": "market_data", "ticker": "005930.KS", "interval": "1mo", "chart": true}"#,
        ],
        ToolKind::News => &[r#"{"tool": "news", "keyword": "Apple"}"#],
        ToolKind::WebSearch => &[
            r#"{"tool": "web_search", "query": "AI trends 2025", "search_type": "news"}"#,
        ],
        ToolKind::DeepSearch => &[r#"{"tool": "deep_search", "query": "AI trends 2025"}"#],
        ToolKind::DocumentStore => &[
            r#"{"tool": "document_store", "action": "find", "db_name": "mydb", "coll_name": "users"}"#,
            r#"{"tool": "document_store", "action": "find_one", "db_name": "mydb", "coll_name": "users", "query": {"name": "Alice"}}"#,
            r#"{"tool": "document_store", "action": "insert", "db_name": "mydb", "coll_name": "users", "data": {"name": "Alice", "age": 30}}"#,
            r#"{"tool": "document_store", "action": "update", "db_name": "mydb", "coll_name": "users", "query": {"name": "Alice"}, "update": {"$set": {"age": 31}}}"#,
            r#"{"tool": "document_store", "action": "delete", "db_name": "mydb", "coll_name": "users", "query": {"age": {"$lt": 18}}, "many": true}"#,
        ],
    }
}

pub fn build_catalog(registry: &ToolRegistry) -> String {
    let mut out = String::from("You can call the following tools:\n");
    for tool in registry.tools() {
        let schema = serde_json::to_string(&tool.parameters_schema()).unwrap_or_default();
        let _ = write!(
            out,
            "\n- {}: {}\n  parameters (JSON Schema): {}\n",
            tool.name(),
            tool.description(),
            schema
        );
    }

    if registry.contains(ToolKind::DocumentStore.name()) {
        out.push_str(
            "\nThe user has explicitly granted direct access to the document store. \
When they ask to view, add, change or remove stored data, return a document_store call; \
never answer that you lack access or permission.\n",
        );
    }

    let lines: Vec<&str> = registry
        .tools()
        .filter_map(|t| ToolKind::from_name(t.name()))
        .flat_map(|kind| examples(kind).iter().copied())
        .collect();
    if !lines.is_empty() {
        let _ = write!(
            out,
            "\nReply ONLY with a JSON array of tool calls, for example:\n[\n  {}\n]\n",
            lines.join(",\n  ")
        );
    }
    out.push_str(
        "\nCombine several tools when the request needs them, in the order the user asked. \
If no tool is needed, reply exactly [{\"tool\": \"none\"}]. \
Never answer the question directly; return only the JSON array.\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolError, ToolOutcome, ToolParams};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test tool"
        }
        async fn execute(&self, _params: ToolParams) -> Result<ToolOutcome, ToolError> {
            Ok(ToolOutcome::Success(String::new()))
        }
    }

    #[test]
    fn test_catalog_lists_only_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("news"));
        registry.register(Named("weather"));
        let catalog = build_catalog(&registry);
        assert!(catalog.contains("- news: test tool"));
        assert!(catalog.contains("- weather: test tool"));
        assert!(catalog.contains(r#"{"tool": "news", "keyword": "Apple"}"#));
        assert!(!catalog.contains("market_data"));
        assert!(!catalog.contains("document store"));
        assert!(catalog.contains(r#"[{"tool": "none"}]"#));
    }

    #[test]
    fn test_catalog_includes_document_store_rule() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("document_store"));
        let catalog = build_catalog(&registry);
        assert!(catalog.contains("direct access to the document store"));
        assert!(catalog.contains(r#""action": "delete""#));
    }
}
