//! 工具参数 JSON Schema 生成（schemars）
//!
//! 各工具的 parameters_schema 由对应的 `*Args` 结构体派生，拼入意图解析 prompt 的能力目录。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 返回 T 的 JSON Schema（serde_json::Value），失败时返回空对象 schema
pub fn args_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::params::{DocumentParams, MarketDataArgs};

    #[test]
    fn test_market_data_schema_lists_ticker() {
        let schema = args_schema::<MarketDataArgs>();
        assert!(schema["properties"]["ticker"].is_object());
        assert!(schema["properties"]["ma_window"].is_object());
    }

    #[test]
    fn test_document_schema_requires_action() {
        let schema = args_schema::<DocumentParams>();
        let required = schema["required"].as_array().cloned().unwrap_or_default();
        assert!(required.iter().any(|v| v == "action"));
    }
}
