//! 智能体注册表
//!
//! 所有智能体实现 Agent trait（name / description / execute(command, args)），
//! 由 AgentRegistry 按名注册与查找。未注册的名称在执行期映射为步骤级 AgentNotFound，
//! 而不是未处理异常。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// 一次能力调用的结果
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: Some(output.into()), error: None }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self { success: false, output: None, error: Some(error.into()) }
    }
}

/// 智能体 trait：名称、描述（供 LLM 挑选能力）、按 command + args 执行
#[async_trait]
pub trait Agent: Send + Sync {
    /// 能力名称（计划步骤 "agent" 字段引用）
    fn name(&self) -> &str;

    /// 能力描述（嵌入生成提示词的能力目录）
    fn description(&self) -> &str;

    async fn execute(&self, command: &str, args: &Map<String, Value>) -> AgentResult;
}

/// 注册表：按名称存储 Arc<dyn Agent>，支持 register / get / agent_names / descriptions
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: impl Agent + 'static) {
        let name = agent.name().to_string();
        self.agents.insert(name, Arc::new(agent));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    /// 返回 (name, description) 列表，用于生成提示词中的 Available agents 段落
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .agents
            .iter()
            .map(|(name, agent)| (name.clone(), agent.description().to_string()))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }
}
