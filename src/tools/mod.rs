pub mod deep_search;
pub mod document_store;
pub mod executor;
pub mod market_data;
pub mod news;
pub mod params;
pub mod registry;
pub mod schema;
pub mod web_search;

pub use deep_search::DeepSearchTool;
pub use document_store::{DocumentStoreTool, SqliteDocumentStore};
pub use executor::ToolExecutor;
pub use market_data::{MarketDataTool, SymbolMap};
pub use news::NewsTool;
pub use params::{
    DeepSearchArgs, DeepSearchParams, DocumentAction, DocumentParams, Interval, MarketDataArgs,
    MarketDataParams, NewsArgs, NewsParams, SearchTopic, SearchType, ToolKind, ToolParams,
    WebSearchArgs, WebSearchParams,
};
pub use registry::{Tool, ToolError, ToolOutcome, ToolRegistry};
pub use web_search::WebSearchTool;

use crate::config::AppConfig;

/// 启动时组装工具注册表（注册顺序即能力目录顺序）
///
/// 文档库打开失败或被禁用时跳过该工具，其余工具照常注册。
pub fn build_registry(cfg: &AppConfig) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(MarketDataTool::new(cfg.tools.market_data.timeout_secs));
    tools.register(NewsTool::new(&cfg.tools.news));
    tools.register(WebSearchTool::new(&cfg.tools.web_search));
    tools.register(DeepSearchTool::new(&cfg.tools.deep_search));

    let doc_cfg = &cfg.tools.document_store;
    if doc_cfg.enabled {
        match SqliteDocumentStore::open(&doc_cfg.path) {
            Ok(store) => tools.register(DocumentStoreTool::new(store, doc_cfg.max_find_results)),
            Err(e) => tracing::warn!(
                path = %doc_cfg.path.display(),
                error = %e,
                "document store unavailable, tool not registered"
            ),
        }
    }

    tracing::info!(tools = ?tools.tool_names(), "tool registry ready");
    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_registry_registers_in_catalog_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.tools.document_store.path = dir.path().join("docs.db");
        let registry = build_registry(&cfg);
        assert_eq!(
            registry.tool_names(),
            vec!["market_data", "news", "web_search", "deep_search", "document_store"]
        );
    }

    #[test]
    fn test_disabled_document_store_is_skipped() {
        let mut cfg = AppConfig::default();
        cfg.tools.document_store.enabled = false;
        let registry = build_registry(&cfg);
        assert_eq!(registry.len(), 4);
        assert!(!registry.contains("document_store"));
    }
}
