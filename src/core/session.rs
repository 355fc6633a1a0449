//! 会话：独占对话历史，持有只读的工具注册表
//!
//! 历史只在两处被修改：用户提交（submit）与编排器在回合结束时追加助手回复。

use std::sync::Arc;

use crate::core::TurnPhase;
use crate::memory::{ConversationHistory, Turn};
use crate::tools::ToolRegistry;

pub struct Session {
    history: ConversationHistory,
    registry: Arc<ToolRegistry>,
}

impl Session {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            history: ConversationHistory::new(),
            registry,
        }
    }

    /// 追加用户发言；空白输入，或上一条发言仍未回答时，不追加并返回 false
    pub fn submit(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || self.phase() == TurnPhase::UserPending {
            return false;
        }
        self.history.push(Turn::user(text));
        true
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn phase(&self) -> TurnPhase {
        match self.history.last() {
            Some(turn) if turn.is_user() => TurnPhase::UserPending,
            _ => TurnPhase::Idle,
        }
    }

    /// 末尾尚未回答的用户发言
    pub fn pending_utterance(&self) -> Option<&str> {
        self.history
            .last()
            .filter(|t| t.is_user())
            .map(|t| t.content.as_str())
    }

    /// 待处理发言之前的历史
    pub fn prior_turns(&self) -> &[Turn] {
        let turns = self.history.turns();
        match self.phase() {
            TurnPhase::UserPending => &turns[..turns.len() - 1],
            TurnPhase::Idle => turns,
        }
    }

    pub(crate) fn push_assistant(&mut self, content: String) {
        self.history.push(Turn::assistant(content));
    }
}
