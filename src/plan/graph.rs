//! 计划依赖图
//!
//! 使用邻接表和入度表实现 DAG 检测与 ready 集计算

use std::collections::{HashMap, VecDeque};

use crate::plan::types::{Plan, StepId, StepStatus};

/// 计划依赖图
pub struct PlanGraph {
    /// 邻接表：步骤 id -> 依赖该步骤的后继步骤列表
    adjacency: HashMap<StepId, Vec<StepId>>,
    /// 入度表：步骤 id -> 前置依赖数
    in_degree: HashMap<StepId, usize>,
}

impl PlanGraph {
    /// 从计划构建依赖图；假定依赖 id 均存在（由 validate 保证）
    pub fn new(plan: &Plan) -> Self {
        let mut adjacency: HashMap<StepId, Vec<StepId>> = HashMap::new();
        let mut in_degree: HashMap<StepId, usize> = HashMap::new();

        for step in &plan.steps {
            in_degree.insert(step.id, 0);
            adjacency.entry(step.id).or_default();
        }

        for step in &plan.steps {
            for dep_id in &step.dependencies {
                adjacency.entry(*dep_id).or_default().push(step.id);
                *in_degree.entry(step.id).or_insert(0) += 1;
            }
        }

        Self { adjacency, in_degree }
    }

    /// Kahn 拓扑排序：能访问全部节点则无环
    pub fn is_acyclic(&self) -> bool {
        let mut degree = self.in_degree.clone();
        let mut queue: VecDeque<StepId> = degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut visited = 0usize;
        while let Some(id) = queue.pop_front() {
            visited += 1;
            if let Some(dependents) = self.adjacency.get(&id) {
                for dep in dependents {
                    if let Some(d) = degree.get_mut(dep) {
                        *d -= 1;
                        if *d == 0 {
                            queue.push_back(*dep);
                        }
                    }
                }
            }
        }

        visited == self.in_degree.len()
    }

    /// 直接后继（依赖 id 指向步骤的所有步骤）
    pub fn dependents(&self, id: StepId) -> &[StepId] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// ready 集：pending 且所有依赖均已 completed 的步骤
    pub fn ready_steps(&self, plan: &Plan) -> Vec<StepId> {
        plan.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .filter(|s| {
                s.dependencies
                    .iter()
                    .all(|d| plan.status_of(*d) == Some(StepStatus::Completed))
            })
            .map(|s| s.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::types::WorkflowStep;

    fn step(id: StepId, deps: Vec<StepId>) -> WorkflowStep {
        WorkflowStep {
            id,
            description: format!("step {id}"),
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
    fn linear_chain_is_acyclic() {
        let plan = Plan::new(vec![step(1, vec![]), step(2, vec![1]), step(3, vec![2])]);
        assert!(PlanGraph::new(&plan).is_acyclic());
    }

    #[test]
    fn cycle_is_detected() {
        let plan = Plan::new(vec![step(1, vec![3]), step(2, vec![1]), step(3, vec![2])]);
        assert!(!PlanGraph::new(&plan).is_acyclic());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let plan = Plan::new(vec![step(1, vec![1])]);
        assert!(!PlanGraph::new(&plan).is_acyclic());
    }

    #[test]
    fn ready_set_respects_dependencies() {
        let mut plan = Plan::new(vec![step(1, vec![]), step(2, vec![1]), step(3, vec![])]);
        let graph = PlanGraph::new(&plan);

        let mut ready = graph.ready_steps(&plan);
        ready.sort();
        assert_eq!(ready, vec![1, 3]);

        plan.get_mut(1).unwrap().status = StepStatus::Completed;
        plan.get_mut(3).unwrap().status = StepStatus::Completed;
        assert_eq!(graph.ready_steps(&plan), vec![2]);
    }

    #[test]
    fn failed_dependency_never_becomes_ready() {
        let mut plan = Plan::new(vec![step(1, vec![]), step(2, vec![1])]);
        plan.get_mut(1).unwrap().status = StepStatus::Failed;
        let graph = PlanGraph::new(&plan);
        assert!(graph.ready_steps(&plan).is_empty());
    }
}
