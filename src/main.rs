//! lisa-plan：命令行入口
//!
//! 用法：`lisa-plan <goal...>`，将目标交给重规划引擎执行并打印每步结果。

use std::sync::Arc;

use anyhow::Result;

use lisa_planner::agents::{AgentRegistry, EchoAgent};
use lisa_planner::config::load_config;
use lisa_planner::engine::PlannerEngine;
use lisa_planner::executor::PlanExecutor;
use lisa_planner::llm::OpenAiClient;
use lisa_planner::observability;
use lisa_planner::plan::StepStatus;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init();

    let goal: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if goal.trim().is_empty() {
        eprintln!("usage: lisa-plan <goal...>");
        std::process::exit(2);
    }

    let cfg = load_config(None)?;

    let mut registry = AgentRegistry::new();
    registry.register(EchoAgent);
    let registry = Arc::new(registry);

    let api_key = cfg.llm.resolve_api_key();
    let llm = Arc::new(OpenAiClient::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        api_key.as_deref(),
    ));

    let executor = PlanExecutor::new(registry.clone())
        .with_step_timeout(cfg.replan.step_timeout_secs);
    let engine = PlannerEngine::new(llm, registry, (&cfg.replan).into()).with_executor(executor);

    let result = engine.run(&goal).await;

    println!("goal: {goal}");
    for step in &result.plan.steps {
        let mark = match step.status {
            StepStatus::Completed => "ok",
            StepStatus::Failed => "FAIL",
            StepStatus::Skipped => "skip",
            _ => "....",
        };
        println!(
            "  [{mark}] step {} {}.{} - {}",
            step.id, step.agent, step.command, step.description
        );
        if let Some(err) = &step.error {
            println!("         error: {err}");
        }
    }
    println!(
        "{} (attempts: {}, {} ms)",
        result.summary, result.attempts, result.duration_ms
    );
    if let Some(err) = &result.error {
        println!("error: {err}");
    }

    std::process::exit(if result.success { 0 } else { 1 });
}
