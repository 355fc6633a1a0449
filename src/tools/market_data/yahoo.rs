//! Yahoo Finance 行情源（v8 chart 接口）

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::tools::market_data::{Bar, PriceSource};
use crate::tools::{Interval, ToolError};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub struct YahooFinance {
    client: Client,
}

impl YahooFinance {
    pub fn new(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl PriceSource for YahooFinance {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Bar>, ToolError> {
        // end 为开区间（与 yfinance 一致）
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        let url = chart_url(symbol)?;
        tracing::info!(symbol = %symbol, %start, %end, %interval, "market_data fetch");

        let resp = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", interval.as_str().to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        // 未知代码返回 404 + chart.error，按「无数据」处理
        if !status.is_success() && status.as_u16() != 404 {
            return Err(ToolError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        parse_chart(&body)
    }
}

/// 代码作为单个路径段追加，`/`、`?`、`#` 等字符会被转义
pub fn chart_url(symbol: &str) -> Result<Url, ToolError> {
    let mut url = Url::parse(CHART_URL).map_err(|e| ToolError::Other(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ToolError::Other(format!("cannot build chart URL for {}", symbol)))?
        .push(symbol);
    Ok(url)
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Default)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// 解析 chart 响应；result 为空（代码不存在等）时返回空序列
pub fn parse_chart(body: &str) -> Result<Vec<Bar>, ToolError> {
    let parsed: ChartResponse =
        serde_json::from_str(body).map_err(|e| ToolError::Decode(e.to_string()))?;
    let Some(result) = parsed.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0)?.date_naive();
            Some(Bar {
                date,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                volume: at(&quote.volume, i).map(|v| v as u64),
            })
        })
        .collect();
    Ok(bars)
}
