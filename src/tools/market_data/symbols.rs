//! 公司名 → 行情代码映射
//!
//! 意图里缺少 ticker 时，分发器用整句话查表；查不到则取大写原文当作代码。

use std::collections::HashMap;

const BUILTIN_SYMBOLS: &[(&str, &str)] = &[
    ("삼성전자", "005930.KS"),
    ("samsung electronics", "005930.KS"),
    ("sk하이닉스", "000660.KS"),
    ("애플", "AAPL"),
    ("apple", "AAPL"),
    ("테슬라", "TSLA"),
    ("tesla", "TSLA"),
    ("마이크로소프트", "MSFT"),
    ("microsoft", "MSFT"),
    ("엔비디아", "NVDA"),
    ("nvidia", "NVDA"),
];

#[derive(Debug, Clone)]
pub struct SymbolMap {
    map: HashMap<String, String>,
}

impl Default for SymbolMap {
    fn default() -> Self {
        Self::with_extra(&HashMap::new())
    }
}

impl SymbolMap {
    /// 内置表 + 配置追加项（配置项覆盖内置同名项）；键统一小写
    pub fn with_extra(extra: &HashMap<String, String>) -> Self {
        let mut map: HashMap<String, String> = BUILTIN_SYMBOLS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in extra {
            map.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
        Self { map }
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.map.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    /// 查表，查不到返回大写原文
    pub fn resolve(&self, text: &str) -> String {
        self.lookup(text)
            .map(String::from)
            .unwrap_or_else(|| text.trim().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_and_unknown() {
        let symbols = SymbolMap::default();
        assert_eq!(symbols.resolve("삼성전자"), "005930.KS");
        assert_eq!(symbols.resolve("  Apple "), "AAPL");
        assert_eq!(symbols.resolve("msft"), "MSFT");
    }

    #[test]
    fn test_extra_entries_override_builtin() {
        let mut extra = HashMap::new();
        extra.insert("Apple".to_string(), "AAPL.MX".to_string());
        extra.insert("카카오".to_string(), "035720.KS".to_string());
        let symbols = SymbolMap::with_extra(&extra);
        assert_eq!(symbols.resolve("apple"), "AAPL.MX");
        assert_eq!(symbols.resolve("카카오"), "035720.KS");
    }
}
