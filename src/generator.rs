//! PlanGenerator：目标 -> 计划 / 失败计划 -> 修订计划
//!
//! 构造包含目标、能力目录与严格 JSON 输出约定的提示词，调用 LLM 后从回复文本中
//! 提取 JSON 数组并解析为 Plan；解析结果再过一遍显式结构校验（id 唯一、依赖可解析、无环），
//! 不依赖提示词措辞保证格式。修订路径额外序列化失败计划（含每步状态与错误）与错误信息，
//! 要求模型输出完整替换计划而非差量。

use std::sync::Arc;

use crate::agents::AgentRegistry;
use crate::error::PlannerError;
use crate::llm::{LlmClient, Message};
use crate::plan::{validate_plan, Plan, WorkflowStep};

const SYSTEM_PROMPT: &str = "You are the planning module of the Lisa assistant. \
You decompose user goals into executable multi-step plans over the available agents.";

/// 计划生成器：持有 LLM 客户端与能力注册表（用于提示词中的能力目录）
pub struct PlanGenerator {
    llm: Arc<dyn LlmClient>,
    registry: Arc<AgentRegistry>,
}

impl PlanGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<AgentRegistry>) -> Self {
        Self { llm, registry }
    }

    /// 从自然语言目标生成计划
    pub async fn generate_plan(&self, goal: &str) -> Result<Plan, PlannerError> {
        let prompt = self.build_generate_prompt(goal);
        self.request_plan(&prompt).await
    }

    /// 根据失败计划与错误信息生成修订计划（完整替换，校验规则与生成一致）
    pub async fn revise_plan(
        &self,
        goal: &str,
        failed_plan: &Plan,
        error_message: &str,
    ) -> Result<Plan, PlannerError> {
        let prompt = self.build_revise_prompt(goal, failed_plan, error_message);
        self.request_plan(&prompt).await
    }

    async fn request_plan(&self, prompt: &str) -> Result<Plan, PlannerError> {
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let output = self.llm.complete(&messages).await?;

        let plan = parse_plan_output(&output)?;
        validate_plan(&plan)?;
        tracing::debug!(steps = plan.steps.len(), "plan parsed and validated");
        Ok(plan)
    }

    fn catalog_section(&self) -> String {
        let mut section = String::from("Available agents:\n");
        for (name, description) in self.registry.descriptions() {
            section.push_str(&format!("- {}: {}\n", name, description));
        }
        section
    }

    fn build_generate_prompt(&self, goal: &str) -> String {
        format!(
            r#"Goal: {goal}

{catalog}
Produce an execution plan for the goal.

Reply with ONLY a JSON array of steps. Each step is an object with fields:
  "id" (integer, unique), "description" (string), "agent" (one of the agent names above),
  "command" (string), "args" (object), "dependencies" (array of step ids that must complete first).

Dependencies must form a directed acyclic graph. Do not include any text outside the JSON array."#,
            goal = goal,
            catalog = self.catalog_section(),
        )
    }

    fn build_revise_prompt(&self, goal: &str, failed_plan: &Plan, error_message: &str) -> String {
        let failed_json = serde_json::to_string_pretty(&failed_plan.steps)
            .unwrap_or_else(|_| "[]".to_string());
        format!(
            r#"Goal: {goal}

{catalog}
The previous plan failed. Per-step status and errors:
{failed_json}

Execution error: {error_message}

Analyze why the plan failed and produce a corrected plan that achieves the goal.
Emit a COMPLETE replacement plan, not a diff.

Reply with ONLY a JSON array of steps. Each step is an object with fields:
  "id" (integer, unique), "description" (string), "agent" (one of the agent names above),
  "command" (string), "args" (object), "dependencies" (array of step ids that must complete first).

Dependencies must form a directed acyclic graph. Do not include any text outside the JSON array."#,
            goal = goal,
            catalog = self.catalog_section(),
            failed_json = failed_json,
            error_message = error_message,
        )
    }
}

/// 从 LLM 输出中提取 JSON 数组并解析为 Plan；步骤运行期字段统一重置为初始值
pub fn parse_plan_output(output: &str) -> Result<Plan, PlannerError> {
    let trimmed = output.trim();

    // 提取 JSON 块（```json ... ``` 或首个 [ 到末个 ]）
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or_else(|| rest.trim())
    } else if let Some(start) = trimmed.find('[') {
        match trimmed.rfind(']') {
            Some(end) if end > start => &trimmed[start..=end],
            _ => {
                return Err(PlannerError::InvalidPlanFormat(
                    "no JSON array in model output".to_string(),
                ))
            }
        }
    } else {
        return Err(PlannerError::InvalidPlanFormat(
            "no JSON array in model output".to_string(),
        ));
    };

    let mut steps: Vec<WorkflowStep> = serde_json::from_str(json_str)
        .map_err(|e| PlannerError::InvalidPlanFormat(format!("{e}: {json_str}")))?;

    // 模型偶尔会回填 status / result 字段，一律忽略
    for step in &mut steps {
        step.reset();
    }

    Ok(Plan::new(steps))
}
