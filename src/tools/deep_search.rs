//! 深度搜索工具（Tavily）
//!
//! search_depth 固定为配置值（默认 advanced），总是请求 AI 摘要；摘要附在结果列表之后。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::DeepSearchSection;
use crate::tools::schema::args_schema;
use crate::tools::{DeepSearchArgs, Tool, ToolError, ToolOutcome, ToolParams};

const TAVILY_URL: &str = "https://api.tavily.com/search";

pub struct DeepSearchTool {
    client: Client,
    api_key: Option<String>,
    max_results: usize,
    search_depth: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TavilyResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<TavilyResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TavilyResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

impl DeepSearchTool {
    pub fn new(cfg: &DeepSearchSection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: std::env::var("TAVILY_API_KEY").ok(),
            max_results: cfg.max_results,
            search_depth: cfg.search_depth.clone(),
        }
    }
}

/// 结果列表 + 可选的 AI 摘要
pub fn format_response(resp: &TavilyResponse) -> String {
    let mut text = resp
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}\n- Summary: {}\n- Link: {}",
                i + 1,
                r.title,
                r.content,
                r.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    if let Some(answer) = resp.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        text.push_str(&format!("\n\n[AI summary]\n{}", answer.trim()));
    }
    text
}

#[async_trait]
impl Tool for DeepSearchTool {
    fn name(&self) -> &str {
        "deep_search"
    }

    fn description(&self) -> &str {
        "In-depth web research via Tavily with an AI-written summary. Use for explanations, background and analysis. `topic`: general (default), news or finance."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<DeepSearchArgs>()
    }

    async fn execute(&self, params: ToolParams) -> Result<ToolOutcome, ToolError> {
        let ToolParams::DeepSearch(p) = params else {
            return Ok(ToolOutcome::Failure(
                "deep_search received parameters for a different tool".to_string(),
            ));
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ToolOutcome::Failure("TAVILY_API_KEY is not set.".to_string()));
        };
        let query = p.query.trim();
        if query.is_empty() {
            return Ok(ToolOutcome::Failure("Please provide a search query.".to_string()));
        }
        tracing::info!(query = %query, topic = p.topic.as_str(), "deep_search");

        let body = json!({
            "query": query,
            "max_results": self.max_results,
            "topic": p.topic.as_str(),
            "include_answer": true,
            "search_depth": self.search_depth,
        });
        let resp = self
            .client
            .post(TAVILY_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        let parsed: TavilyResponse = resp
            .json()
            .await
            .map_err(|e| ToolError::Decode(e.to_string()))?;
        if parsed.results.is_empty() && parsed.answer.is_none() {
            return Ok(ToolOutcome::Failure(format!(
                "No results found for '{}'.",
                query
            )));
        }
        Ok(ToolOutcome::Success(format_response(&parsed)))
    }
}
