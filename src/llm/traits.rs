//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete（非流式单次完成）。
//! 规划器对 LLM 的全部依赖收敛到这一个 trait，便于测试注入脚本化回复。

use async_trait::async_trait;
use thiserror::Error;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 发给 LLM 的单条消息
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// LLM 调用错误
#[derive(Error, Debug)]
pub enum LlmError {
    /// API Key 未配置：在发起任何网络调用之前检查并返回
    #[error("API key is not configured")]
    MissingCredential,

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM returned empty response")]
    EmptyResponse,
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}
