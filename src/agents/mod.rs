//! 智能体层：命名能力的注册与查找
//!
//! 引擎本身不实现任何智能体，只通过 Agent trait 调用外部能力。

pub mod echo;
pub mod registry;

pub use echo::EchoAgent;
pub use registry::{Agent, AgentRegistry, AgentResult};
