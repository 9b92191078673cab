//! Echo 智能体（演示与测试用）

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::agents::{Agent, AgentResult};

/// Echo 智能体：回显文本
pub struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        "EchoAgent"
    }

    fn description(&self) -> &str {
        "Echo text back (for demos and tests). Command: say, args: {\"text\": \"message\"}"
    }

    async fn execute(&self, command: &str, args: &Map<String, Value>) -> AgentResult {
        match command {
            "say" => {
                let text = args.get("text").and_then(|v| v.as_str()).unwrap_or("(empty)");
                AgentResult::ok(text)
            }
            other => AgentResult::err(format!("unknown command: {other}")),
        }
    }
}
