//! Agent 错误类型
//!
//! 解析级、路由级错误在编排内部被吸收；工具错误转为结果文本；只有综合阶段的 LLM 失败会向上传播。

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型输出不是合法 JSON 数组（解析器内部重试，最终退化为 none）
    #[error("Intent resolution parse error: {0}")]
    ResolutionParse(String),

    /// 意图指向未注册的工具（静默丢弃）
    #[error("Tool not registered: {0}")]
    UnroutableTool(String),

    #[error("Invalid parameters for {tool}: {reason}")]
    InvalidParameters { tool: String, reason: String },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 综合回答时 LLM 调用失败；不重试，直接交给调用方
    #[error("Synthesis failed: {0}")]
    Synthesis(#[source] LlmError),

    #[error("Config error: {0}")]
    ConfigError(String),
}
