//! 工具执行器
//!
//! 对每次工具调用施加超时，超时或工具出错时转为 AgentError（ToolTimeout / ToolExecutionFailed）；
//! 每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{Tool, ToolOutcome, ToolParams};

pub struct ToolExecutor {
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn execute(
        &self,
        tool: Arc<dyn Tool>,
        params: ToolParams,
    ) -> Result<ToolOutcome, AgentError> {
        let tool_name = tool.name().to_string();
        let start = Instant::now();
        let args_preview = args_preview(&params);
        let result = timeout(self.timeout, tool.execute(params)).await;

        let outcome = match &result {
            Ok(Ok(ToolOutcome::Success(_))) => "ok",
            Ok(Ok(ToolOutcome::Failure(_))) => "failure",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e.to_string())),
            Err(_) => Err(AgentError::ToolTimeout(tool_name)),
        }
    }
}

fn args_preview(params: &ToolParams) -> String {
    let s = serde_json::to_string(params).unwrap_or_default();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{NewsParams, ToolError};
    use async_trait::async_trait;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn execute(&self, _params: ToolParams) -> Result<ToolOutcome, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolOutcome::Success("late".into()))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always errors"
        }

        async fn execute(&self, _params: ToolParams) -> Result<ToolOutcome, ToolError> {
            Err(ToolError::Other("socket closed".into()))
        }
    }

    fn news() -> ToolParams {
        ToolParams::News(NewsParams {
            keyword: String::new(),
        })
    }

    #[tokio::test]
    async fn test_timeout_maps_to_tool_timeout() {
        let executor = ToolExecutor {
            timeout: Duration::from_millis(20),
        };
        let err = executor.execute(Arc::new(SlowTool), news()).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(name) if name == "slow"));
    }

    #[tokio::test]
    async fn test_tool_error_maps_to_execution_failed() {
        let executor = ToolExecutor::new(5);
        let err = executor.execute(Arc::new(BrokenTool), news()).await.unwrap_err();
        assert!(err.to_string().contains("socket closed"));
    }
}
