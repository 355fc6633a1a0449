//! 工具分发：按顺序执行意图，逐个收集结果
//!
//! - `none` 与未注册的工具静默跳过
//! - 参数不符合契约时记一条 Failure 结果，不调用工具
//! - 工具出错或超时记一条 Error 结果；无论如何都继续处理后面的意图
//! - 工具输出中的媒体标记在这里拆分，结果文本只保留叙述部分

pub mod contract;
pub mod media;

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use crate::core::state::send_event;
use crate::core::{AgentError, TurnEvent};
use crate::intent::ToolIntent;
use crate::tools::{SymbolMap, ToolExecutor, ToolOutcome, ToolRegistry};

pub use contract::{display_param, extract_params, guess_interval};
pub use media::{split_media, Media};

/// 工具输出中内嵌媒体的分隔标记，之后是 base64 载荷
pub const CHART_MARKER: &str = "[CHART_IMAGE_BASE64]:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// 工具正常返回
    Success,
    /// 工具（或参数校验）给出了可读的失败说明
    Failure,
    /// 工具调用本身出错或超时
    Error,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Success => "success",
            ResultStatus::Failure => "failure",
            ResultStatus::Error => "error",
        }
    }
}

/// 单次工具调用的结果，只在本回合内存在
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool: String,
    /// 原始意图中的参数
    pub parameters: Map<String, Value>,
    /// 综合 prompt 中展示的参数
    pub display: String,
    pub text: String,
    pub media: Option<Media>,
    pub status: ResultStatus,
}

pub struct Dispatcher {
    executor: ToolExecutor,
    symbols: SymbolMap,
}

impl Dispatcher {
    pub fn new(executor: ToolExecutor, symbols: SymbolMap) -> Self {
        Self { executor, symbols }
    }

    /// 顺序执行意图；返回的结果与意图顺序一致
    pub async fn dispatch(
        &self,
        utterance: &str,
        intents: &[ToolIntent],
        registry: &ToolRegistry,
        events: Option<&UnboundedSender<TurnEvent>>,
    ) -> Vec<ToolResult> {
        let today = chrono::Local::now().date_naive();
        let mut results = Vec::new();

        for intent in intents {
            if intent.is_none() {
                continue;
            }
            let Some(tool) = registry.get(&intent.tool) else {
                tracing::debug!(error = %AgentError::UnroutableTool(intent.tool.clone()), "skipping intent");
                continue;
            };

            let params = extract_params(intent, utterance, today, &self.symbols);
            let display = display_param(intent, params.as_ref().ok());
            let (status, raw) = match params {
                Err(e) => {
                    tracing::warn!(tool = %intent.tool, error = %e, "intent rejected");
                    (ResultStatus::Failure, e.to_string())
                }
                Ok(params) => {
                    send_event(events, TurnEvent::ToolStarted { tool: intent.tool.clone() });
                    match self.executor.execute(Arc::clone(&tool), params).await {
                        Ok(ToolOutcome::Success(text)) => (ResultStatus::Success, text),
                        Ok(ToolOutcome::Failure(text)) => (ResultStatus::Failure, text),
                        Err(e) => {
                            tracing::warn!(tool = %intent.tool, error = %e, "tool call failed");
                            (ResultStatus::Error, e.to_string())
                        }
                    }
                }
            };

            let (text, media) = split_media(&raw);
            send_event(
                events,
                TurnEvent::ToolFinished {
                    tool: intent.tool.clone(),
                    status: status.as_str().to_string(),
                },
            );
            results.push(ToolResult {
                tool: intent.tool.clone(),
                parameters: intent.parameters.clone(),
                display,
                text,
                media,
                status,
            });
        }
        results
    }
}
