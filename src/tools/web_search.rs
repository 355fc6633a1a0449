//! Web 搜索工具（SerpAPI）
//!
//! search_type 决定 engine（google / google_news / google_images / youtube / google_scholar）；
//! answer_box、knowledge_graph、people_also_ask 取普通 google 结果中的特殊区块。
//! 结果整理为编号列表，超过 num 条截断。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::WebSearchSection;
use crate::tools::schema::args_schema;
use crate::tools::{SearchType, Tool, ToolError, ToolOutcome, ToolParams, WebSearchArgs};

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
    location: String,
    hl: String,
    gl: String,
    num: usize,
}

impl WebSearchTool {
    pub fn new(cfg: &WebSearchSection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: std::env::var("SERPAPI_API_KEY").ok(),
            location: cfg.location.clone(),
            hl: cfg.hl.clone(),
            gl: cfg.gl.clone(),
            num: cfg.num,
        }
    }

    async fn search(&self, api_key: &str, query: &str, search_type: SearchType) -> Result<Value, ToolError> {
        let resp = self
            .client
            .get(SERPAPI_URL)
            .query(&[
                ("q", query),
                ("api_key", api_key),
                ("location", self.location.as_str()),
                ("hl", self.hl.as_str()),
                ("gl", self.gl.as_str()),
                ("num", self.num.to_string().as_str()),
                ("engine", search_type.engine()),
            ])
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
        resp.json().await.map_err(|e| ToolError::Decode(e.to_string()))
    }
}

fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str)
}

/// 按 search_type 整理 SerpAPI 返回
pub fn format_results(results: &Value, search_type: SearchType, query: &str, num: usize) -> ToolOutcome {
    match search_type {
        SearchType::AnswerBox => {
            let answer = results.get("answer_box").and_then(|b| {
                str_field(b, "answer")
                    .or_else(|| str_field(b, "snippet"))
                    .or_else(|| str_field(b, "title"))
            });
            match answer {
                Some(a) => ToolOutcome::Success(format!("[Answer Box]\n{}", a)),
                None => ToolOutcome::Failure("No answer box found.".to_string()),
            }
        }
        SearchType::KnowledgeGraph => match results.get("knowledge_graph").and_then(Value::as_object) {
            Some(kg) if !kg.is_empty() => {
                let lines: Vec<String> = kg
                    .iter()
                    .map(|(k, v)| match v.as_str() {
                        Some(s) => format!("{}: {}", k, s),
                        None => format!("{}: {}", k, v),
                    })
                    .collect();
                ToolOutcome::Success(format!("[Knowledge Graph]\n{}", lines.join("\n")))
            }
            _ => ToolOutcome::Failure("No knowledge graph found.".to_string()),
        },
        SearchType::PeopleAlsoAsk => {
            let questions: Vec<String> = results
                .get("related_questions")
                .or_else(|| results.get("people_also_ask"))
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|q| str_field(q, "question"))
                        .map(|q| format!("- {}", q))
                        .collect()
                })
                .unwrap_or_default();
            if questions.is_empty() {
                ToolOutcome::Failure("No 'people also ask' questions found.".to_string())
            } else {
                ToolOutcome::Success(format!("[People Also Ask]\n{}", questions.join("\n")))
            }
        }
        _ => {
            let (key, label, link_key, snippet_key) = match search_type {
                SearchType::News => ("news_results", "news", "link", Some("snippet")),
                SearchType::Images => ("images_results", "image", "original", None),
                SearchType::Videos => ("video_results", "video", "link", Some("description")),
                SearchType::Scholar => ("organic_results", "scholar", "link", Some("snippet")),
                _ => ("organic_results", "web", "link", Some("snippet")),
            };
            let items = results
                .get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if items.is_empty() {
                return ToolOutcome::Failure(format!(
                    "No {} search results found for '{}'.",
                    label, query
                ));
            }
            let lines: Vec<String> = items
                .iter()
                .take(num)
                .enumerate()
                .map(|(i, item)| {
                    let title = str_field(item, "title").unwrap_or("(no title)");
                    let link = str_field(item, link_key).unwrap_or("");
                    match snippet_key.and_then(|k| str_field(item, k)) {
                        Some(snippet) => format!("{}. {}\n{}\n{}", i + 1, title, snippet, link),
                        None if snippet_key.is_some() => format!("{}. {}\n\n{}", i + 1, title, link),
                        None => format!("{}. {}\n{}", i + 1, title, link),
                    }
                })
                .collect();
            ToolOutcome::Success(lines.join("\n\n"))
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Real-time Google/YouTube search via SerpAPI. `search_type` selects the vertical: web (default), news, images, videos, scholar, answer_box, knowledge_graph, people_also_ask."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<WebSearchArgs>()
    }

    async fn execute(&self, params: ToolParams) -> Result<ToolOutcome, ToolError> {
        let ToolParams::WebSearch(p) = params else {
            return Ok(ToolOutcome::Failure(
                "web_search received parameters for a different tool".to_string(),
            ));
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ToolOutcome::Failure(
                "SERPAPI_API_KEY is not set.".to_string(),
            ));
        };
        let query = p.query.trim();
        if query.is_empty() {
            return Ok(ToolOutcome::Failure("Please provide a search query.".to_string()));
        }
        tracing::info!(query = %query, search_type = ?p.search_type, "web_search");
        let results = self.search(api_key, query, p.search_type).await?;
        Ok(format_results(&results, p.search_type, query, self.num))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::WebSearchParams;
    use serde_json::json;

    #[test]
    fn test_web_results_are_numbered_and_capped() {
        let results = json!({"organic_results": [
            {"title": "A", "link": "https://a", "snippet": "sa"},
            {"title": "B", "link": "https://b", "snippet": "sb"},
            {"title": "C", "link": "https://c", "snippet": "sc"}
        ]});
        let out = format_results(&results, SearchType::Web, "q", 2);
        assert_eq!(out, ToolOutcome::Success("1. A\nsa\nhttps://a\n\n2. B\nsb\nhttps://b".into()));
    }

    #[test]
    fn test_images_use_original_link() {
        let results = json!({"images_results": [{"title": "cat", "original": "https://img/cat.png"}]});
        let out = format_results(&results, SearchType::Images, "cat", 5);
        assert_eq!(out.text(), "1. cat\nhttps://img/cat.png");
    }

    #[test]
    fn test_answer_box_falls_back_to_snippet() {
        let results = json!({"answer_box": {"snippet": "42"}});
        let out = format_results(&results, SearchType::AnswerBox, "q", 5);
        assert_eq!(out.text(), "[Answer Box]\n42");
        let out = format_results(&json!({}), SearchType::AnswerBox, "q", 5);
        assert!(!out.is_success());
    }

    #[test]
    fn test_people_also_ask_reads_related_questions() {
        let results = json!({"related_questions": [{"question": "Why?"}, {"snippet": "x"}]});
        let out = format_results(&results, SearchType::PeopleAlsoAsk, "q", 5);
        assert_eq!(out.text(), "[People Also Ask]\n- Why?");
    }

    #[test]
    fn test_empty_news_is_failure() {
        let out = format_results(&json!({"news_results": []}), SearchType::News, "rust", 5);
        assert_eq!(
            out,
            ToolOutcome::Failure("No news search results found for 'rust'.".into())
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_is_failure_text() {
        let mut tool = WebSearchTool::new(&WebSearchSection::default());
        tool.api_key = None;
        let out = tool
            .execute(ToolParams::WebSearch(WebSearchParams {
                query: "AI trends".into(),
                search_type: SearchType::News,
            }))
            .await
            .unwrap();
        assert_eq!(out, ToolOutcome::Failure("SERPAPI_API_KEY is not set.".into()));
    }
}
