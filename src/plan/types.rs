//! 计划核心类型
//!
//! WorkflowStep / Plan / Checkpoint / PlanTemplate / ExecutionResult。
//! Plan 内部全部为自有数据（String / Vec / Map），Clone 即深拷贝：快照与原计划互不影响。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type StepId = u32;

/// 步骤状态机：pending -> running -> {completed | failed}；pending -> skipped。
/// completed / failed / skipped 均为终态，步骤一旦进入终态不再变更。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped)
    }
}

/// 计划中的单个步骤：绑定一个智能体的一次 command 调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// 计划内唯一的整数 id
    pub id: StepId,
    pub description: String,
    /// 能力名，对应注册表中的智能体
    pub agent: String,
    pub command: String,
    /// 有序的参数键值对（serde_json 开启 preserve_order）
    #[serde(default)]
    pub args: Map<String, Value>,
    /// 前置步骤 id，必须全部存在于同一计划内
    #[serde(default)]
    pub dependencies: Vec<StepId>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
}

impl WorkflowStep {
    /// 清除运行期字段，回到初始 pending 状态
    pub fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.result = None;
        self.error = None;
        self.started_at = None;
        self.finished_at = None;
    }

    /// 结构等价：同一 agent / command / args（忽略 id 与运行期状态），
    /// 用于修订计划时判断某步骤是否与上次已完成的步骤等价
    pub fn same_work_as(&self, other: &WorkflowStep) -> bool {
        self.agent == other.agent && self.command == other.command && self.args == other.args
    }
}

/// 步骤的有序序列，依赖关系构成 DAG
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<WorkflowStep>,
}

impl Plan {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self { steps }
    }

    pub fn get(&self, id: StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: StepId) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn status_of(&self, id: StepId) -> Option<StepStatus> {
        self.get(id).map(|s| s.status)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn all_completed(&self) -> bool {
        !self.steps.is_empty()
            && self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    pub fn all_terminal(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// 所有步骤回到 pending（模板保存时使用）
    pub fn reset_all(&mut self) {
        for step in &mut self.steps {
            step.reset();
        }
    }
}

/// 计划的持久化快照，供中断后恢复
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub plan: Plan,
    pub created_at: i64,
}

/// 可复用的计划模板：按名称存储，步骤状态已重置为 pending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTemplate {
    pub name: String,
    pub plan: Plan,
    pub created_at: i64,
}

/// 一次执行（或一轮重规划）的最终结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// 全部步骤 completed 时为 true
    pub success: bool,
    /// 运行结束时的完整计划（含每步终态与错误）
    pub plan: Plan,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    /// 重规划循环累计的尝试次数（首次生成为 1）
    pub attempts: usize,
}

impl ExecutionResult {
    /// 计划尚未执行即失败（生成 / 校验阶段出错）
    pub fn planning_failure(plan: Plan, error: String, attempts: usize) -> Self {
        Self {
            success: false,
            plan,
            summary: "Plan generation failed".to_string(),
            error: Some(error),
            duration_ms: 0,
            attempts,
        }
    }
}

/// 当前 Unix 毫秒时间戳
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
