//! 行情工具：拉取日/周/月线，计算移动平均与 RSI，输出明细表、统计摘要与图表
//!
//! 图表（SVG）以 base64 追加在文本末尾，前缀为 `[CHART_IMAGE_BASE64]: `，由分发器拆出。

pub mod chart;
pub mod indicators;
pub mod symbols;
pub mod yahoo;

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::NaiveDate;
use serde_json::Value;

use crate::dispatch::CHART_MARKER;
use crate::tools::schema::args_schema;
use crate::tools::{
    Interval, MarketDataArgs, MarketDataParams, Tool, ToolError, ToolOutcome, ToolParams,
};

pub use symbols::SymbolMap;
pub use yahoo::YahooFinance;

/// 单根 K 线
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

/// 行情源
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Bar>, ToolError>;
}

pub struct MarketDataTool {
    source: Arc<dyn PriceSource>,
}

impl MarketDataTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self::with_source(Arc::new(YahooFinance::new(timeout_secs)))
    }

    pub fn with_source(source: Arc<dyn PriceSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for MarketDataTool {
    fn name(&self) -> &str {
        "market_data"
    }

    fn description(&self) -> &str {
        "Stock prices with technical indicators: daily/weekly/monthly table (close, moving average, RSI, volume, open, high, low), summary statistics and a chart. \
The ticker MUST be a Yahoo Finance symbol (e.g. AAPL for Apple, 005930.KS for Samsung Electronics); always convert company names to their ticker before filling `ticker`. \
Set `chart` to true whenever a price graph is useful."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<MarketDataArgs>()
    }

    async fn execute(&self, params: ToolParams) -> Result<ToolOutcome, ToolError> {
        let ToolParams::MarketData(p) = params else {
            return Ok(ToolOutcome::Failure(
                "market_data received parameters for a different tool".to_string(),
            ));
        };
        let bars = self.source.fetch(&p.symbol, p.start, p.end, p.interval).await?;
        if bars.is_empty() {
            return Ok(ToolOutcome::Failure(format!(
                "No price data found for {} (start={}, end={}, interval={})",
                p.symbol, p.start, p.end, p.interval
            )));
        }
        Ok(ToolOutcome::Success(render_report(&p, &bars)))
    }
}

/// 生成文本报告（含可选摘要与图表标记）
pub fn render_report(p: &MarketDataParams, bars: &[Bar]) -> String {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| b.close).collect();
    let ma = indicators::moving_average(&closes, p.ma_window);
    let rsi = indicators::rsi(&closes, p.rsi_window);

    let mut lines = vec![
        format!(
            "{} price data ({} ~ {}, interval: {})",
            p.symbol, p.start, p.end, p.interval
        ),
        format!(
            "Includes moving average ({}) and RSI ({})",
            p.ma_window, p.rsi_window
        ),
        "Date | Close | MA | RSI | Volume | Open | High | Low".to_string(),
    ];
    for (i, bar) in bars.iter().enumerate() {
        lines.push(format!(
            "{} | {} | {} | {} | {} | {} | {} | {}",
            bar.date.format("%Y-%m-%d"),
            fmt_price(bar.close),
            fmt_price(ma[i]),
            fmt_price(rsi[i]),
            bar.volume.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            fmt_price(bar.open),
            fmt_price(bar.high),
            fmt_price(bar.low),
        ));
    }

    if p.summary {
        if let Some(s) = indicators::summarize(&closes) {
            lines.push(String::new());
            lines.push(format!(
                "Summary: high {:.2}, low {:.2}, mean {:.2}, period change {:.2}%",
                s.max, s.min, s.mean, s.pct_change
            ));
        }
    }

    let mut text = lines.join("\n");
    if p.chart {
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        let svg = chart::render_svg(&chart::ChartInput {
            title: format!("{} price & indicators", p.symbol),
            dates: &dates,
            closes: &closes,
            ma: &ma,
            ma_window: p.ma_window,
            rsi: &rsi,
            rsi_window: p.rsi_window,
        });
        let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
        text.push_str(&format!("\n\n{} {}", CHART_MARKER, encoded));
    }
    text
}

fn fmt_price(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<Bar>);

    #[async_trait]
    impl PriceSource for FixedSource {
        async fn fetch(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _interval: Interval,
        ) -> Result<Vec<Bar>, ToolError> {
            Ok(self.0.clone())
        }
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close: Some(close),
            volume: Some(1000),
        }
    }

    fn params(chart: bool) -> MarketDataParams {
        MarketDataParams {
            symbol: "AAPL".into(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            interval: Interval::Daily,
            ma_window: 2,
            rsi_window: 2,
            summary: true,
            chart,
        }
    }

    #[tokio::test]
    async fn test_report_has_table_and_summary() {
        let tool = MarketDataTool::with_source(Arc::new(FixedSource(vec![
            bar(2, 100.0),
            bar(3, 110.0),
        ])));
        let out = tool
            .execute(ToolParams::MarketData(params(false)))
            .await
            .unwrap();
        let text = out.text();
        assert!(out.is_success());
        assert!(text.starts_with("AAPL price data (2024-01-01 ~ 2024-01-31, interval: 1d)"));
        assert!(text.contains("2024-01-02 | 100.00 | - | - | 1000 | 99.00 | 101.00 | 98.00"));
        assert!(text.contains("2024-01-03 | 110.00 | 105.00 | 100.00 |"));
        assert!(text.contains("period change 10.00%"));
        assert!(!text.contains(CHART_MARKER));
    }

    #[tokio::test]
    async fn test_chart_is_appended_with_marker() {
        let tool = MarketDataTool::with_source(Arc::new(FixedSource(vec![
            bar(2, 100.0),
            bar(3, 101.0),
            bar(4, 99.0),
        ])));
        let out = tool
            .execute(ToolParams::MarketData(params(true)))
            .await
            .unwrap();
        let (narrative, payload) = out.text().split_once(CHART_MARKER).unwrap();
        assert!(narrative.contains("Summary:"));
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .unwrap();
        assert!(String::from_utf8(decoded).unwrap().starts_with("<svg"));
    }

    #[tokio::test]
    async fn test_empty_series_is_failure() {
        let tool = MarketDataTool::with_source(Arc::new(FixedSource(vec![])));
        let out = tool
            .execute(ToolParams::MarketData(params(true)))
            .await
            .unwrap();
        assert!(!out.is_success());
        assert!(out.text().contains("No price data found for AAPL"));
    }
}
