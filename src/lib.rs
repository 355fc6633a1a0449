//! Jarvis - 自然语言驱动的多工具编排助手
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、回合状态、会话与编排器（advance 一次完成一个回合）
//! - **dispatch**: 按工具契约校验参数、顺序调用工具、拆分内嵌媒体
//! - **intent**: 能力目录 prompt、JSON 数组截取、带重试的意图解析
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）
//! - **memory**: 对话历史
//! - **synthesis**: 多工具结果综合与直接回答
//! - **tools**: 工具 trait、注册表、执行器与五个内置工具

pub mod config;
pub mod core;
pub mod dispatch;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod synthesis;
pub mod tools;

pub use crate::core::{create_assistant, AgentError, Orchestrator, Session, TurnEvent, TurnOutput};
pub use crate::dispatch::{ToolResult, CHART_MARKER};
pub use crate::intent::{IntentResolver, ToolIntent};
pub use crate::synthesis::Synthesizer;
