//! 核心编排层：错误类型、回合状态、会话与主控编排

pub mod error;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use error::AgentError;
pub use orchestrator::{create_assistant, Orchestrator, TurnOutput};
pub use session::Session;
pub use state::{TurnEvent, TurnPhase};
