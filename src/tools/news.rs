//! 新闻工具（NewsAPI）
//!
//! 关键词为空时取所在国家的今日头条；否则先查头条，没有结果再退回全量检索（英文、按发布时间倒序）。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::NewsSection;
use crate::tools::schema::args_schema;
use crate::tools::{NewsArgs, Tool, ToolError, ToolOutcome, ToolParams};

const NEWS_API_BASE: &str = "https://newsapi.org/v2";

pub struct NewsTool {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    country: String,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub source: ArticleSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSource {
    pub name: Option<String>,
}

impl NewsTool {
    pub fn new(cfg: &NewsSection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: NEWS_API_BASE.to_string(),
            api_key: std::env::var("NEWS_API_KEY").ok(),
            country: cfg.country.clone(),
            page_size: cfg.page_size,
        }
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Vec<Article>, ToolError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let resp = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .header("X-Api-Key", api_key)
            .query(query)
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
        let parsed: NewsResponse = resp
            .json()
            .await
            .map_err(|e| ToolError::Decode(e.to_string()))?;
        Ok(parsed.articles)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Article>, ToolError> {
        let page_size = self.page_size.to_string();
        let mut query = vec![
            ("country", self.country.clone()),
            ("pageSize", page_size.clone()),
        ];
        if keyword.is_empty() {
            return self.get("top-headlines", &query).await;
        }
        query.push(("q", keyword.to_string()));
        let headlines = self.get("top-headlines", &query).await?;
        if !headlines.is_empty() {
            return Ok(headlines);
        }
        tracing::debug!(keyword = %keyword, "no headlines, falling back to everything");
        self.get(
            "everything",
            &[
                ("q", keyword.to_string()),
                ("language", "en".to_string()),
                ("sortBy", "publishedAt".to_string()),
                ("pageSize", page_size),
            ],
        )
        .await
    }
}

/// 编号列表：标题 / 摘要 / 来源 / 链接
pub fn format_articles(articles: &[Article]) -> String {
    articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{}. {}\n- Summary: {}\n- Source: {}\n- Link: {}",
                i + 1,
                a.title.as_deref().unwrap_or("(no title)"),
                a.description.as_deref().unwrap_or("(no description)"),
                a.source.name.as_deref().unwrap_or("(unknown source)"),
                a.url.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for NewsTool {
    fn name(&self) -> &str {
        "news"
    }

    fn description(&self) -> &str {
        "Latest news articles (5 items) about a keyword such as a person, company or issue. Leave `keyword` empty for today's top headlines."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<NewsArgs>()
    }

    async fn execute(&self, params: ToolParams) -> Result<ToolOutcome, ToolError> {
        let ToolParams::News(p) = params else {
            return Ok(ToolOutcome::Failure(
                "news received parameters for a different tool".to_string(),
            ));
        };
        if self.api_key.is_none() {
            return Ok(ToolOutcome::Failure("NEWS_API_KEY is not set.".to_string()));
        }
        let keyword = p.keyword.trim();
        tracing::info!(keyword = %keyword, "news tool search");
        let articles = self.search(keyword).await?;
        if articles.is_empty() {
            return Ok(ToolOutcome::Failure(format!(
                "No news found for '{}'.",
                keyword
            )));
        }
        Ok(ToolOutcome::Success(format_articles(&articles)))
    }
}
