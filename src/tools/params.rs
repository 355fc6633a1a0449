//! 工具参数契约
//!
//! `*Args` 是 LLM 在意图 JSON 中给出的原始字段（用于生成 schema 与反序列化）；
//! `*Params` 是分发器校验并补全默认值之后交给工具执行的参数。

use std::fmt;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 内置工具种类；每种工具的参数契约由其身份固定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    MarketData,
    News,
    WebSearch,
    DeepSearch,
    DocumentStore,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::MarketData,
        ToolKind::News,
        ToolKind::WebSearch,
        ToolKind::DeepSearch,
        ToolKind::DocumentStore,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::MarketData => "market_data",
            ToolKind::News => "news",
            ToolKind::WebSearch => "web_search",
            ToolKind::DeepSearch => "deep_search",
            ToolKind::DocumentStore => "document_store",
        }
    }

    /// 综合 prompt 中结果块的标签
    pub fn category(&self) -> &'static str {
        match self {
            ToolKind::MarketData => "Market data",
            ToolKind::News => "News",
            ToolKind::WebSearch => "Web search",
            ToolKind::DeepSearch => "Deep search",
            ToolKind::DocumentStore => "Document store",
        }
    }
}

/// 分发器交给工具的参数
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolParams {
    MarketData(MarketDataParams),
    News(NewsParams),
    WebSearch(WebSearchParams),
    DeepSearch(DeepSearchParams),
    DocumentStore(DocumentParams),
    /// 非内置工具：原样透传意图中的字段
    Generic(Map<String, Value>),
}

// ---------------------------------------------------------------------------
// market_data

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct MarketDataArgs {
    /// 行情代码，必须是 Yahoo Finance 可识别的格式（如 AAPL、005930.KS）；公司名须先换成代码
    pub ticker: Option<String>,
    /// 开始日期 YYYY-MM-DD，默认当年 1 月 1 日
    pub start: Option<String>,
    /// 结束日期 YYYY-MM-DD，默认今天
    pub end: Option<String>,
    /// 采样间隔：1d / 1wk / 1mo
    pub interval: Option<String>,
    /// 移动平均窗口，默认 5
    pub ma_window: Option<usize>,
    /// RSI 窗口，默认 14
    pub rsi_window: Option<usize>,
    /// 是否附带统计摘要，默认 true
    pub summary: Option<bool>,
    /// 是否生成图表，默认 true
    pub chart: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1d" | "d" | "day" | "daily" => Some(Interval::Daily),
            "1wk" | "1w" | "w" | "week" | "weekly" => Some(Interval::Weekly),
            "1mo" | "month" | "monthly" => Some(Interval::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketDataParams {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
    pub ma_window: usize,
    pub rsi_window: usize,
    pub summary: bool,
    pub chart: bool,
}

// ---------------------------------------------------------------------------
// news

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NewsArgs {
    /// 关键词（人物、公司、话题）；留空表示今日头条
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsParams {
    pub keyword: String,
}

// ---------------------------------------------------------------------------
// web_search / deep_search

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct WebSearchArgs {
    /// 自然语言检索词
    pub query: Option<String>,
    /// web / news / images / videos / scholar / answer_box / knowledge_graph / people_also_ask，默认 web
    pub search_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Web,
    News,
    Images,
    Videos,
    Scholar,
    AnswerBox,
    KnowledgeGraph,
    PeopleAlsoAsk,
}

impl SearchType {
    /// 未知取值按 web 处理
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("news") => SearchType::News,
            Some("images") | Some("image") => SearchType::Images,
            Some("videos") | Some("video") => SearchType::Videos,
            Some("scholar") => SearchType::Scholar,
            Some("answer_box") => SearchType::AnswerBox,
            Some("knowledge_graph") => SearchType::KnowledgeGraph,
            Some("people_also_ask") => SearchType::PeopleAlsoAsk,
            _ => SearchType::Web,
        }
    }

    /// 对应的 SerpAPI engine
    pub fn engine(&self) -> &'static str {
        match self {
            SearchType::News => "google_news",
            SearchType::Images => "google_images",
            SearchType::Videos => "youtube",
            SearchType::Scholar => "google_scholar",
            _ => "google",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebSearchParams {
    pub query: String,
    pub search_type: SearchType,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DeepSearchArgs {
    /// 自然语言检索词
    pub query: Option<String>,
    /// general / news / finance，默认 general
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTopic {
    General,
    News,
    Finance,
}

impl SearchTopic {
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("news") => SearchTopic::News,
            Some("finance") => SearchTopic::Finance,
            _ => SearchTopic::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTopic::General => "general",
            SearchTopic::News => "news",
            SearchTopic::Finance => "finance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepSearchParams {
    pub query: String,
    pub topic: SearchTopic,
}

// ---------------------------------------------------------------------------
// document_store

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAction {
    /// 多条查询（最多返回 10 条）
    Find,
    /// 单条查询
    FindOne,
    Insert,
    Update,
    Delete,
}

/// document_store 的参数：原始字段即契约，只补 many 的默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentParams {
    pub action: DocumentAction,
    /// 数据库名，如 "mydb"
    pub db_name: Option<String>,
    /// 集合名，如 "users"
    pub coll_name: Option<String>,
    /// 查询 / 更新 / 删除条件，如 {"name": "Alice"} 或 {"age": {"$lt": 18}}
    pub query: Option<Map<String, Value>>,
    /// insert 的文档
    pub data: Option<Map<String, Value>>,
    /// update 操作符，如 {"$set": {"age": 31}}
    pub update: Option<Map<String, Value>>,
    /// 是否作用于多条文档
    #[serde(default)]
    pub many: bool,
    /// 按 _id 直接定位
    pub object_id: Option<String>,
    /// 返回字段限制，如 {"name": 1, "_id": 0}
    pub projection: Option<Map<String, Value>>,
}
