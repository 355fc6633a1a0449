//! 回合阶段与过程事件
//!
//! 事件只用于展示当前在做什么（解析 / 调用某工具 / 综合），不参与控制流。

use serde::Serialize;

/// 会话所处阶段：末尾是用户发言即为待处理
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    UserPending,
}

/// 单回合过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// 正在让 LLM 判断要用哪些工具
    Resolving,
    /// 意图解析完成（按顺序列出工具名，含 none）
    IntentsResolved { tools: Vec<String> },
    /// 开始调用工具
    ToolStarted { tool: String },
    /// 工具返回
    ToolFinished { tool: String, status: String },
    /// 正在综合工具结果
    Synthesizing { tools: Vec<String> },
    /// 无工具，直接回答
    AnsweringDirectly,
    /// 助手回复已写入历史
    Answered,
}

pub(crate) fn send_event(
    tx: Option<&tokio::sync::mpsc::UnboundedSender<TurnEvent>>,
    ev: TurnEvent,
) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}
