//! 计划数据模型、依赖图与校验

pub mod graph;
pub mod types;
pub mod validate;

pub use graph::PlanGraph;
pub use types::{
    Checkpoint, ExecutionResult, Plan, PlanTemplate, StepId, StepStatus, WorkflowStep,
};
pub use validate::validate_plan;
