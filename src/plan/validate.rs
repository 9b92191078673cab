//! 计划结构校验
//!
//! 独立于提示词措辞的显式校验：id 唯一、依赖可解析、依赖关系无环。
//! 任何违例统一作为 InvalidPlanFormat 返回；未通过校验的计划绝不进入执行。

use std::collections::HashSet;

use crate::error::PlannerError;
use crate::plan::graph::PlanGraph;
use crate::plan::types::Plan;

/// 校验计划结构，通过后才允许执行
pub fn validate_plan(plan: &Plan) -> Result<(), PlannerError> {
    if plan.steps.is_empty() {
        return Err(PlannerError::InvalidPlanFormat("plan has no steps".to_string()));
    }

    let mut ids = HashSet::new();
    for step in &plan.steps {
        if !ids.insert(step.id) {
            return Err(PlannerError::InvalidPlanFormat(format!(
                "duplicate step id: {}",
                step.id
            )));
        }
        if step.agent.trim().is_empty() {
            return Err(PlannerError::InvalidPlanFormat(format!(
                "step {} has no agent",
                step.id
            )));
        }
        if step.command.trim().is_empty() {
            return Err(PlannerError::InvalidPlanFormat(format!(
                "step {} has no command",
                step.id
            )));
        }
    }

    for step in &plan.steps {
        for dep in &step.dependencies {
            if !ids.contains(dep) {
                return Err(PlannerError::InvalidPlanFormat(format!(
                    "step {} depends on unknown step {}",
                    step.id, dep
                )));
            }
        }
    }

    if !PlanGraph::new(plan).is_acyclic() {
        return Err(PlannerError::InvalidPlanFormat(
            "dependency cycle detected".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::types::{StepStatus, WorkflowStep};

    fn step(id: u32, deps: Vec<u32>) -> WorkflowStep {
        WorkflowStep {
            id,
            description: String::new(),
            agent: "EchoAgent".to_string(),
            command: "say".to_string(),
            args: serde_json::Map::new(),
            dependencies: deps,
            status: StepStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn valid_dag_passes() {
        let plan = Plan::new(vec![step(1, vec![]), step(2, vec![1])]);
        assert!(validate_plan(&plan).is_ok());
    }

    #[test]
    fn empty_plan_rejected() {
        let err = validate_plan(&Plan::default()).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidPlanFormat(_)));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let plan = Plan::new(vec![step(1, vec![]), step(1, vec![])]);
        let err = validate_plan(&plan).unwrap_err();
        assert!(err.to_string().contains("duplicate step id"));
    }

    #[test]
    fn unknown_dependency_rejected() {
        let plan = Plan::new(vec![step(1, vec![99])]);
        let err = validate_plan(&plan).unwrap_err();
        assert!(err.to_string().contains("unknown step 99"));
    }

    #[test]
    fn cycle_rejected() {
        let plan = Plan::new(vec![step(1, vec![2]), step(2, vec![1])]);
        let err = validate_plan(&plan).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn missing_agent_rejected() {
        let mut s = step(1, vec![]);
        s.agent = String::new();
        let err = validate_plan(&Plan::new(vec![s])).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidPlanFormat(_)));
    }
}
