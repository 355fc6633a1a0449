//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `JARVIS__*` 覆盖（双下划线表示嵌套，如 `JARVIS__LLM__PROVIDER=openai`）。
//! API Key 不进配置文件，由各客户端 / 工具直接读环境变量。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub resolver: ResolverSection,
    pub tools: ToolsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 行情图表等媒体文件的保存目录（仅命令行外壳使用）
    pub media_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "Jarvis".to_string(),
            media_dir: PathBuf::from("media"),
        }
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：gemini / openai / mock；对应 API Key 缺失时退回 mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub gemini: LlmModelOverride,
    pub openai: LlmModelOverride,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: crate::llm::GEMINI_FLASH.to_string(),
            base_url: None,
            gemini: LlmModelOverride::default(),
            openai: LlmModelOverride::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmModelOverride {
    pub model: Option<String>,
}

/// [resolver] 段：意图解析
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    /// 解析失败时整轮重试的总次数（含首次）
    pub max_attempts: usize,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub market_data: MarketDataSection,
    pub news: NewsSection,
    pub web_search: WebSearchSection,
    pub deep_search: DeepSearchSection,
    pub document_store: DocumentStoreSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 60,
            market_data: MarketDataSection::default(),
            news: NewsSection::default(),
            web_search: WebSearchSection::default(),
            deep_search: DeepSearchSection::default(),
            document_store: DocumentStoreSection::default(),
        }
    }
}

/// [tools.market_data] 段：名称 → 代码映射（追加到内置表）、请求超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataSection {
    pub symbols: HashMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for MarketDataSection {
    fn default() -> Self {
        Self {
            symbols: HashMap::new(),
            timeout_secs: 20,
        }
    }
}

/// [tools.news] 段（NewsAPI）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsSection {
    pub country: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for NewsSection {
    fn default() -> Self {
        Self {
            country: "kr".to_string(),
            page_size: 5,
            timeout_secs: 15,
        }
    }
}

/// [tools.web_search] 段（SerpAPI）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSearchSection {
    pub location: String,
    pub hl: String,
    pub gl: String,
    pub num: usize,
    pub timeout_secs: u64,
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            location: "South Korea".to_string(),
            hl: "ko".to_string(),
            gl: "kr".to_string(),
            num: 5,
            timeout_secs: 15,
        }
    }
}

/// [tools.deep_search] 段（Tavily）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeepSearchSection {
    pub max_results: usize,
    /// basic / advanced
    pub search_depth: String,
    pub timeout_secs: u64,
}

impl Default for DeepSearchSection {
    fn default() -> Self {
        Self {
            max_results: 5,
            search_depth: "advanced".to_string(),
            timeout_secs: 30,
        }
    }
}

/// [tools.document_store] 段：SQLite 文件路径、find 返回上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentStoreSection {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_find_results: usize,
}

impl Default for DocumentStoreSection {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("data/documents.db"),
            max_find_results: 10,
        }
    }
}

/// 从 config 目录加载配置，环境变量 JARVIS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（可覆盖前面的键）；文件不存在视为配置错误
/// 3. 最后叠加环境变量 JARVIS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, AgentError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(AgentError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("JARVIS")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| AgentError::ConfigError(e.to_string()))
}
