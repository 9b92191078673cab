//! 规划器错误类型
//!
//! 与重规划循环配合：InvalidPlanFormat 走修订路径重试，MissingCredential 立即终止
//! 且不发起任何网络调用，NotFound 为本地类型化失败，不重试。

use thiserror::Error;

use crate::llm::LlmError;

/// 规划与执行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum PlannerError {
    /// 模型输出无法解析为合法计划（JSON 错误、重复 id、依赖缺失、成环等）
    #[error("Invalid plan format: {0}")]
    InvalidPlanFormat(String),

    /// 步骤引用的智能体未注册
    #[error("AgentNotFound: no agent named '{0}'")]
    AgentNotFound(String),

    /// 检查点 / 模板不存在
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// LLM 调用失败（含 API Key 未配置）
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl PlannerError {
    /// 致命错误不进入修订路径（如缺少 API Key，重试毫无意义）
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlannerError::Llm(LlmError::MissingCredential))
    }
}
