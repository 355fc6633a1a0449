//! 按工具身份校验意图参数并补全默认值
//!
//! 内置工具各有固定契约（见 [`ToolKind`]）；未知但已注册的工具原样透传字段。

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::intent::ToolIntent;
use crate::tools::{
    DeepSearchArgs, DeepSearchParams, DocumentParams, Interval, MarketDataArgs, MarketDataParams,
    NewsArgs, NewsParams, SearchTopic, SearchType, SymbolMap, ToolKind, ToolParams, WebSearchArgs,
    WebSearchParams,
};

const DEFAULT_MA_WINDOW: usize = 5;
const DEFAULT_RSI_WINDOW: usize = 14;

/// 由原话中的周期词推断采样间隔（月 > 周 > 日），都没有时按日线
pub fn guess_interval(utterance: &str) -> Interval {
    let lower = utterance.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["월별", "월간", "매월", "monthly", "month"]) {
        Interval::Monthly
    } else if has(&["주별", "주간", "매주", "weekly", "week"]) {
        Interval::Weekly
    } else {
        Interval::Daily
    }
}

fn invalid(tool: &str, reason: impl Into<String>) -> AgentError {
    AgentError::InvalidParameters {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

fn decode<T: DeserializeOwned>(tool: &str, params: &Map<String, Value>) -> Result<T, AgentError> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| invalid(tool, e.to_string()))
}

fn parse_date(tool: &str, field: &str, raw: &str) -> Result<NaiveDate, AgentError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(tool, format!("{} must be YYYY-MM-DD, got '{}'", field, raw)))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn market_data(
    intent: &ToolIntent,
    utterance: &str,
    today: NaiveDate,
    symbols: &SymbolMap,
) -> Result<MarketDataParams, AgentError> {
    let tool = intent.tool.as_str();
    let args: MarketDataArgs = decode(tool, &intent.parameters)?;

    let symbol = match non_empty(args.ticker) {
        Some(t) => symbols.lookup(&t).map(String::from).unwrap_or(t),
        None => symbols.resolve(utterance),
    };
    if symbol.is_empty() {
        return Err(invalid(tool, "a ticker such as AAPL or 005930.KS is required"));
    }

    let start = match non_empty(args.start) {
        Some(s) => parse_date(tool, "start", &s)?,
        None => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
    };
    let end = match non_empty(args.end) {
        Some(s) => parse_date(tool, "end", &s)?,
        None => today,
    };
    if start > end {
        return Err(invalid(tool, format!("start {} is after end {}", start, end)));
    }

    let interval = match non_empty(args.interval) {
        Some(s) => Interval::parse(&s)
            .ok_or_else(|| invalid(tool, format!("interval must be 1d, 1wk or 1mo, got '{}'", s)))?,
        None => guess_interval(utterance),
    };

    let ma_window = args.ma_window.unwrap_or(DEFAULT_MA_WINDOW);
    let rsi_window = args.rsi_window.unwrap_or(DEFAULT_RSI_WINDOW);
    if ma_window == 0 || rsi_window == 0 {
        return Err(invalid(tool, "ma_window and rsi_window must be positive"));
    }

    Ok(MarketDataParams {
        symbol,
        start,
        end,
        interval,
        ma_window,
        rsi_window,
        summary: args.summary.unwrap_or(true),
        chart: args.chart.unwrap_or(true),
    })
}

/// 把意图转成交给工具的参数
pub fn extract_params(
    intent: &ToolIntent,
    utterance: &str,
    today: NaiveDate,
    symbols: &SymbolMap,
) -> Result<ToolParams, AgentError> {
    let tool = intent.tool.as_str();
    let Some(kind) = ToolKind::from_name(tool) else {
        return Ok(ToolParams::Generic(intent.parameters.clone()));
    };
    let params = match kind {
        ToolKind::MarketData => {
            ToolParams::MarketData(market_data(intent, utterance, today, symbols)?)
        }
        ToolKind::News => {
            let args: NewsArgs = decode(tool, &intent.parameters)?;
            ToolParams::News(NewsParams {
                keyword: non_empty(args.keyword).unwrap_or_default(),
            })
        }
        ToolKind::WebSearch => {
            let args: WebSearchArgs = decode(tool, &intent.parameters)?;
            let query = non_empty(args.query).ok_or_else(|| invalid(tool, "query is required"))?;
            ToolParams::WebSearch(WebSearchParams {
                query,
                search_type: SearchType::parse_or_default(args.search_type.as_deref()),
            })
        }
        ToolKind::DeepSearch => {
            let args: DeepSearchArgs = decode(tool, &intent.parameters)?;
            let query = non_empty(args.query).ok_or_else(|| invalid(tool, "query is required"))?;
            ToolParams::DeepSearch(DeepSearchParams {
                query,
                topic: SearchTopic::parse_or_default(args.topic.as_deref()),
            })
        }
        ToolKind::DocumentStore => {
            ToolParams::DocumentStore(decode::<DocumentParams>(tool, &intent.parameters)?)
        }
    };
    Ok(params)
}

/// 综合 prompt 中结果块的展示参数
pub fn display_param(intent: &ToolIntent, params: Option<&ToolParams>) -> String {
    let field = |key: &str| {
        intent
            .parameters
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    match params {
        Some(ToolParams::MarketData(p)) => p.symbol.clone(),
        Some(ToolParams::News(p)) => p.keyword.clone(),
        Some(ToolParams::WebSearch(p)) => p.query.clone(),
        Some(ToolParams::DeepSearch(p)) => p.query.clone(),
        _ => match ToolKind::from_name(&intent.tool) {
            Some(ToolKind::MarketData) => field("ticker"),
            Some(ToolKind::News) => field("keyword"),
            Some(ToolKind::WebSearch) | Some(ToolKind::DeepSearch) => field("query"),
            // 文档库与未知工具展示整条意图
            _ => serde_json::to_string(intent).unwrap_or_default(),
        },
    }
}
