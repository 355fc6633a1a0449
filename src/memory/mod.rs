//! 记忆层：对话消息与会话历史

pub mod conversation;

pub use conversation::{ConversationHistory, Message, Role, Turn, TurnRole};
