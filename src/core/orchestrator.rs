//! 编排器：一次 advance 完成一个回合
//!
//! 只有当会话末尾是未回答的用户发言时才执行 解析 → 分发 → 综合，并以追加助手回复结束；
//! 其他情况下 advance 什么也不做，因此外壳可以在任何状态变化后重复调用。
//! 综合失败时不追加任何内容，用户发言保持待处理。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::config::AppConfig;
use crate::core::state::send_event;
use crate::core::{AgentError, Session, TurnEvent};
use crate::dispatch::{Dispatcher, ToolResult};
use crate::intent::IntentResolver;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::synthesis::{tools_used, Synthesizer};
use crate::tools::{build_registry, SymbolMap, ToolExecutor, ToolRegistry};

/// 一个回合的产出：写入历史的回答，以及本回合的工具结果（含媒体）
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub answer: String,
    pub results: Vec<ToolResult>,
}

pub struct Orchestrator {
    resolver: IntentResolver,
    dispatcher: Dispatcher,
    synthesizer: Synthesizer,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, registry: &ToolRegistry, cfg: &AppConfig) -> Self {
        Self {
            resolver: IntentResolver::new(llm.clone(), registry, cfg.resolver.max_attempts),
            dispatcher: Dispatcher::new(
                ToolExecutor::new(cfg.tools.tool_timeout_secs),
                SymbolMap::with_extra(&cfg.tools.market_data.symbols),
            ),
            synthesizer: Synthesizer::new(llm),
        }
    }

    /// 处理待回答的用户发言；没有待处理发言时返回 Ok(None)
    pub async fn advance(
        &self,
        session: &mut Session,
        events: Option<&UnboundedSender<TurnEvent>>,
    ) -> Result<Option<TurnOutput>, AgentError> {
        let Some(utterance) = session.pending_utterance().map(String::from) else {
            return Ok(None);
        };

        send_event(events, TurnEvent::Resolving);
        let intents = self.resolver.resolve(&utterance).await;
        send_event(
            events,
            TurnEvent::IntentsResolved {
                tools: intents.iter().map(|i| i.tool.clone()).collect(),
            },
        );

        let results = self
            .dispatcher
            .dispatch(&utterance, &intents, session.registry(), events)
            .await;

        let answer = if results.is_empty() {
            send_event(events, TurnEvent::AnsweringDirectly);
            self.synthesizer
                .synthesize_direct(&utterance, session.prior_turns())
                .await?
        } else {
            send_event(
                events,
                TurnEvent::Synthesizing {
                    tools: tools_used(&results),
                },
            );
            self.synthesizer
                .synthesize_with_tools(&utterance, &results)
                .await?
        };

        session.push_assistant(answer.clone());
        send_event(events, TurnEvent::Answered);
        tracing::info!(results = results.len(), "turn completed");
        Ok(Some(TurnOutput { answer, results }))
    }
}

/// 按配置组装编排器与空会话（LLM 后端、工具注册表）
pub fn create_assistant(cfg: &AppConfig) -> (Orchestrator, Session) {
    let llm = create_llm_from_config(cfg);
    let registry = Arc::new(build_registry(cfg));
    let orchestrator = Orchestrator::new(llm, &registry, cfg);
    (orchestrator, Session::new(registry))
}
