//! 重规划主循环（引擎对外入口）
//!
//! run(request)：第 1 次尝试从请求生成计划并执行；失败则携带失败计划与错误信息
//! 调用修订路径获得新计划再执行，直至成功或尝试数耗尽。耗尽时原样返回最后一次
//! 失败的 ExecutionResult，调用方可以精确检查每一步的失败原因。
//! 恢复是结构性的（一份实质不同的计划），不是盲目的单步重试。

use std::sync::Arc;

use crate::agents::AgentRegistry;
use crate::error::PlannerError;
use crate::executor::PlanExecutor;
use crate::generator::PlanGenerator;
use crate::llm::LlmClient;
use crate::plan::{ExecutionResult, Plan, StepStatus};

/// 重规划循环配置
#[derive(Debug, Clone)]
pub struct ReplanConfig {
    /// 最大尝试次数（首次生成计为第 1 次）
    pub max_attempts: usize,
    /// 修订计划中与上次已完成步骤等价（同 agent/command/args）的步骤
    /// 是否直接继承 completed 状态与结果；false 时修订计划从头重跑
    pub carry_completed: bool,
}

impl Default for ReplanConfig {
    fn default() -> Self {
        Self { max_attempts: 3, carry_completed: false }
    }
}

/// 规划引擎：generator + executor + 重规划策略
pub struct PlannerEngine {
    generator: PlanGenerator,
    executor: PlanExecutor,
    config: ReplanConfig,
}

impl PlannerEngine {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<AgentRegistry>, config: ReplanConfig) -> Self {
        Self {
            generator: PlanGenerator::new(llm, registry.clone()),
            executor: PlanExecutor::new(registry),
            config,
        }
    }

    /// 替换默认执行器（自定义超时 / 取消令牌）
    pub fn with_executor(mut self, executor: PlanExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// 取消当前运行：下一个 ready 集分发前生效
    pub fn cancel(&self) {
        self.executor.cancel_token().cancel();
    }

    /// 仅生成计划，不执行
    pub async fn generate_plan(&self, goal: &str) -> Result<Plan, PlannerError> {
        self.generator.generate_plan(goal).await
    }

    /// 仅修订计划，不执行
    pub async fn revise_plan(
        &self,
        goal: &str,
        failed_plan: &Plan,
        error_message: &str,
    ) -> Result<Plan, PlannerError> {
        self.generator.revise_plan(goal, failed_plan, error_message).await
    }

    /// 执行一份既有计划（模板 / 检查点恢复出的计划走这里）
    pub async fn execute(&self, plan: Plan) -> ExecutionResult {
        self.executor.execute(plan).await
    }

    /// 重规划主循环：generate -> execute -> (失败时) revise -> execute
    pub async fn run(&self, request: &str) -> ExecutionResult {
        if self.config.max_attempts == 0 {
            return ExecutionResult::planning_failure(
                Plan::default(),
                "replan loop configured with zero attempts".to_string(),
                0,
            );
        }

        let mut last_result: Option<ExecutionResult> = None;
        let mut last_plan: Option<Plan> = None;
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_attempts {
            tracing::info!(attempt, max = self.config.max_attempts, "planning attempt");

            let generated = match &last_plan {
                None => self.generator.generate_plan(request).await,
                Some(failed) => self.generator.revise_plan(request, failed, &last_error).await,
            };

            let mut plan = match generated {
                Ok(plan) => plan,
                Err(e) => {
                    let message = e.to_string();
                    let result = ExecutionResult::planning_failure(
                        last_plan.clone().unwrap_or_default(),
                        message.clone(),
                        attempt,
                    );
                    if e.is_fatal() {
                        return result;
                    }
                    tracing::warn!(attempt, error = %message, "plan generation failed");
                    last_error = message;
                    last_result = Some(result);
                    continue;
                }
            };

            if self.config.carry_completed {
                if let Some(previous) = &last_plan {
                    carry_completed_steps(&mut plan, previous);
                }
            }

            let mut result = self.executor.execute(plan).await;
            result.attempts = attempt;

            if result.success {
                tracing::info!(attempt, "plan executed successfully");
                return result;
            }

            last_error = result
                .error
                .clone()
                .unwrap_or_else(|| "execution failed".to_string());
            last_plan = Some(result.plan.clone());
            tracing::warn!(attempt, error = %last_error, "plan execution failed");
            last_result = Some(result);
        }

        // max_attempts >= 1 保证循环至少写入一次 last_result
        last_result.unwrap_or_else(|| {
            ExecutionResult::planning_failure(Plan::default(), last_error, self.config.max_attempts)
        })
    }
}

/// 将上一份计划中已完成步骤的结果带入修订计划中的等价步骤
fn carry_completed_steps(plan: &mut Plan, previous: &Plan) {
    for step in &mut plan.steps {
        let done = previous
            .steps
            .iter()
            .find(|p| p.status == StepStatus::Completed && p.same_work_as(step));
        if let Some(done) = done {
            step.status = StepStatus::Completed;
            step.result = done.result.clone();
            step.started_at = done.started_at;
            step.finished_at = done.finished_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use super::*;
    use crate::agents::{Agent, AgentResult, EchoAgent};
    use crate::llm::MockLlmClient;

    const ECHO_PLAN: &str = r#"[{"id": 1, "description": "echo", "agent": "EchoAgent",
        "command": "say", "args": {"text": "hi"}, "dependencies": []}]"#;

    const GHOST_PLAN: &str = r#"[{"id": 1, "description": "nope", "agent": "GhostAgent",
        "command": "vanish", "args": {}, "dependencies": []}]"#;

    fn engine_with(llm: Arc<MockLlmClient>, config: ReplanConfig) -> PlannerEngine {
        let mut registry = AgentRegistry::new();
        registry.register(EchoAgent);
        PlannerEngine::new(llm, Arc::new(registry), config)
    }

    #[tokio::test]
    async fn first_attempt_success_skips_revision() {
        let llm = Arc::new(MockLlmClient::with_replies(vec![ECHO_PLAN]));
        let engine = engine_with(llm.clone(), ReplanConfig::default());

        let result = engine.run("say hi").await;

        assert!(result.success);
        assert_eq!(result.attempts, 1);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_execution_triggers_revision() {
        let llm = Arc::new(MockLlmClient::with_replies(vec![GHOST_PLAN, ECHO_PLAN]));
        let engine = engine_with(llm.clone(), ReplanConfig::default());

        let result = engine.run("do something").await;

        assert!(result.success);
        assert_eq!(result.attempts, 2);
        assert_eq!(llm.call_count(), 2);
        // 修订提示词里携带失败计划与错误信息
        let revise_prompt = &llm.prompts()[1];
        assert!(revise_prompt.contains("GhostAgent"));
        assert!(revise_prompt.contains("AgentNotFound"));
    }

    #[tokio::test]
    async fn unparseable_output_also_goes_through_revision_path() {
        let llm = Arc::new(MockLlmClient::with_replies(vec!["sorry, no plan", ECHO_PLAN]));
        let engine = engine_with(llm.clone(), ReplanConfig::default());

        let result = engine.run("say hi").await;

        assert!(result.success);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn exhausted_attempts_return_last_failure_unchanged() {
        let llm = Arc::new(MockLlmClient::with_replies(vec![GHOST_PLAN, GHOST_PLAN, GHOST_PLAN]));
        let engine = engine_with(llm.clone(), ReplanConfig { max_attempts: 3, carry_completed: false });

        let result = engine.run("do something").await;

        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(llm.call_count(), 3);
        // 最后一次失败的计划原样返回，步骤级错误可检查
        assert_eq!(result.plan.status_of(1), Some(StepStatus::Failed));
        assert!(result.error.unwrap().contains("AgentNotFound"));
    }

    /// 记录每个 command 调用次数的测试智能体
    struct CountingAgent {
        ok_calls: Arc<AtomicUsize>,
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl Agent for CountingAgent {
        fn name(&self) -> &str {
            "Counting"
        }
        fn description(&self) -> &str {
            "counts invocations"
        }
        async fn execute(&self, command: &str, _args: &Map<String, Value>) -> AgentResult {
            match command {
                "stable" => {
                    self.ok_calls.fetch_add(1, Ordering::SeqCst);
                    AgentResult::ok("stable done")
                }
                "flaky" => {
                    if self.failures_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                        v.checked_sub(1)
                    }).is_ok()
                    {
                        AgentResult::err("flaky failed")
                    } else {
                        AgentResult::ok("flaky done")
                    }
                }
                other => AgentResult::err(format!("unknown command: {other}")),
            }
        }
    }

    const TWO_STEP_PLAN: &str = r#"[
        {"id": 1, "description": "stable work", "agent": "Counting", "command": "stable",
         "args": {}, "dependencies": []},
        {"id": 2, "description": "flaky work", "agent": "Counting", "command": "flaky",
         "args": {}, "dependencies": []}
    ]"#;

    #[tokio::test]
    async fn carry_completed_skips_already_done_work() {
        let ok_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = AgentRegistry::new();
        registry.register(CountingAgent {
            ok_calls: ok_calls.clone(),
            failures_left: AtomicUsize::new(1),
        });

        let llm = Arc::new(MockLlmClient::with_replies(vec![TWO_STEP_PLAN, TWO_STEP_PLAN]));
        let engine = PlannerEngine::new(
            llm,
            Arc::new(registry),
            ReplanConfig { max_attempts: 3, carry_completed: true },
        );

        let result = engine.run("do both").await;

        assert!(result.success);
        assert_eq!(result.attempts, 2);
        // stable 步骤第二轮被继承，智能体只被调用一次
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn without_carry_the_revised_plan_reruns_everything() {
        let ok_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = AgentRegistry::new();
        registry.register(CountingAgent {
            ok_calls: ok_calls.clone(),
            failures_left: AtomicUsize::new(1),
        });

        let llm = Arc::new(MockLlmClient::with_replies(vec![TWO_STEP_PLAN, TWO_STEP_PLAN]));
        let engine = PlannerEngine::new(
            llm,
            Arc::new(registry),
            ReplanConfig { max_attempts: 3, carry_completed: false },
        );

        let result = engine.run("do both").await;

        assert!(result.success);
        assert_eq!(ok_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_attempts_is_an_explicit_failure() {
        let llm = Arc::new(MockLlmClient::with_replies(vec![ECHO_PLAN]));
        let engine = engine_with(llm.clone(), ReplanConfig { max_attempts: 0, carry_completed: false });

        let result = engine.run("say hi").await;

        assert!(!result.success);
        assert_eq!(llm.call_count(), 0);
    }
}
