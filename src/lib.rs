//! Lisa Planner - 目标到计划的工作流引擎
//!
//! 模块划分：
//! - **agents**: 智能体注册表（命名能力，execute(command, args) 调用）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **engine**: 重规划主循环（generate -> execute -> revise，受最大尝试数约束）
//! - **executor**: DAG 调度执行器（ready 集并发分发、失败跳过传播）
//! - **generator**: PlanGenerator（LLM 生成/修订计划 + 结构校验）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **plan**: 计划数据模型、依赖图与校验
//! - **store**: 检查点与模板存储（键值持久化之上的深拷贝快照）

pub mod agents;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod generator;
pub mod llm;
pub mod observability;
pub mod plan;
pub mod store;

pub use agents::{Agent, AgentRegistry, AgentResult};
pub use engine::{PlannerEngine, ReplanConfig};
pub use error::PlannerError;
pub use executor::PlanExecutor;
pub use generator::PlanGenerator;
pub use plan::{Checkpoint, ExecutionResult, Plan, PlanTemplate, StepStatus, WorkflowStep};
pub use store::{CheckpointStore, JsonFileStore, KeyValueStore, MemoryStore, TemplateStore};
