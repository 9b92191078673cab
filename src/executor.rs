//! DAG 调度执行器
//!
//! 反复计算 ready 集（pending 且所有依赖 completed），对同一 ready 集内的步骤并发分发
//! （相互之间无共享可变状态，完成顺序不作保证）；依赖中出现 failed / skipped 的步骤
//! 直接标记 skipped，不再分发。ready 集为空且无法再推进时循环终止。
//! 执行器不做步骤级重试，恢复完全交给上层重规划循环。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::agents::AgentRegistry;
use crate::plan::types::now_millis;
use crate::plan::{validate_plan, ExecutionResult, Plan, StepId, StepStatus};

/// 单步默认超时（秒）
const DEFAULT_STEP_TIMEOUT_SECS: u64 = 60;

/// 计划执行器：持有注册表、单步超时与取消令牌
pub struct PlanExecutor {
    registry: Arc<AgentRegistry>,
    step_timeout: Duration,
    cancel_token: CancellationToken,
}

impl PlanExecutor {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_step_timeout(mut self, timeout_secs: u64) -> Self {
        self.step_timeout = Duration::from_secs(timeout_secs);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// 取消令牌：触发后在下一个 ready 集分发前停止（已分发的步骤允许跑完或各自超时）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 执行计划直至无法推进，返回含最终计划的 ExecutionResult
    pub async fn execute(&self, mut plan: Plan) -> ExecutionResult {
        let start = Instant::now();

        if let Err(e) = validate_plan(&plan) {
            return ExecutionResult {
                success: false,
                plan,
                summary: "Plan rejected by validation".to_string(),
                error: Some(e.to_string()),
                duration_ms: start.elapsed().as_millis() as u64,
                attempts: 1,
            };
        }

        let graph = crate::plan::PlanGraph::new(&plan);
        let mut cancelled = false;

        loop {
            propagate_skips(&mut plan);

            if self.cancel_token.is_cancelled() {
                cancelled = true;
                break;
            }

            let ready = graph.ready_steps(&plan);
            if ready.is_empty() {
                break;
            }

            // 分发前克隆调用参数；计划本身只由本路径在 await 之后统一写回
            let mut dispatches: Vec<(StepId, String, String, Map<String, Value>)> = Vec::new();
            for id in ready {
                if let Some(step) = plan.get_mut(id) {
                    step.status = StepStatus::Running;
                    step.started_at = Some(now_millis());
                    dispatches.push((id, step.agent.clone(), step.command.clone(), step.args.clone()));
                }
            }

            let outcomes = join_all(dispatches.into_iter().map(|(id, agent, command, args)| {
                async move { (id, self.dispatch(id, &agent, &command, &args).await) }
            }))
            .await;

            for (id, outcome) in outcomes {
                if let Some(step) = plan.get_mut(id) {
                    step.finished_at = Some(now_millis());
                    match outcome {
                        Ok(output) => {
                            step.status = StepStatus::Completed;
                            step.result = Some(output);
                        }
                        Err(error) => {
                            step.status = StepStatus::Failed;
                            step.error = Some(error);
                        }
                    }
                }
            }
        }

        finish(plan, cancelled, start.elapsed().as_millis() as u64)
    }

    async fn dispatch(
        &self,
        id: StepId,
        agent_name: &str,
        command: &str,
        args: &Map<String, Value>,
    ) -> Result<String, String> {
        let start = Instant::now();
        let outcome = match self.registry.get(agent_name) {
            None => Err(crate::error::PlannerError::AgentNotFound(agent_name.to_string()).to_string()),
            Some(agent) => match timeout(self.step_timeout, agent.execute(command, args)).await {
                Err(_) => Err(format!(
                    "step timed out after {}s",
                    self.step_timeout.as_secs()
                )),
                Ok(result) if result.success => Ok(result.output.unwrap_or_default()),
                Ok(result) => Err(result
                    .error
                    .unwrap_or_else(|| "agent reported failure".to_string())),
            },
        };

        let audit = serde_json::json!({
            "event": "step_audit",
            "step": id,
            "agent": agent_name,
            "command": command,
            "ok": outcome.is_ok(),
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "step");

        outcome
    }
}

/// 跳过传播：依赖中含 failed / skipped 的 pending 步骤标记为 skipped，循环至不动点
fn propagate_skips(plan: &mut Plan) {
    loop {
        let mut to_skip: Vec<StepId> = Vec::new();
        for step in &plan.steps {
            if step.status != StepStatus::Pending {
                continue;
            }
            let blocked = step.dependencies.iter().any(|d| {
                matches!(
                    plan.status_of(*d),
                    Some(StepStatus::Failed) | Some(StepStatus::Skipped)
                )
            });
            if blocked {
                to_skip.push(step.id);
            }
        }
        if to_skip.is_empty() {
            break;
        }
        for id in to_skip {
            if let Some(step) = plan.get_mut(id) {
                step.status = StepStatus::Skipped;
                step.error = Some("skipped: dependency failed".to_string());
            }
        }
    }
}

fn finish(plan: Plan, cancelled: bool, duration_ms: u64) -> ExecutionResult {
    let total = plan.steps.len();
    let completed: Vec<String> = plan
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .map(|s| format!("step {}: {}", s.id, s.description))
        .collect();
    let failed: Vec<String> = plan
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .map(|s| {
            format!(
                "step {} ({}.{}): {}",
                s.id,
                s.agent,
                s.command,
                s.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    let success = !cancelled && plan.all_completed();
    let summary = if success {
        format!("All {} steps completed ({})", total, completed.join(", "))
    } else {
        format!("Completed {}/{} steps", completed.len(), total)
    };

    let error = if cancelled {
        Some("Cancelled before dispatching remaining steps".to_string())
    } else if failed.is_empty() {
        None
    } else {
        Some(failed.join("; "))
    };

    ExecutionResult {
        success,
        plan,
        summary,
        error,
        duration_ms,
        attempts: 1,
    }
}
