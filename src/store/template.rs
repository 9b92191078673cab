//! 模板存储
//!
//! 按名称保存可复用计划：保存时深拷贝并将所有步骤重置为 pending；
//! 同名保存覆盖旧模板。load_template 返回深拷贝，契约与检查点一致。

use std::sync::Arc;

use crate::error::PlannerError;
use crate::plan::types::now_millis;
use crate::plan::{Plan, PlanTemplate};
use crate::store::KeyValueStore;

pub const TEMPLATES_KEY: &str = "planner_templates";

/// 模板存储：名称 -> 状态已重置的计划快照
pub struct TemplateStore {
    store: Arc<dyn KeyValueStore>,
    templates: Vec<PlanTemplate>,
}

impl TemplateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let templates = match store.load(TEMPLATES_KEY) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "corrupt template index, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load template index");
                Vec::new()
            }
        };
        Self { store, templates }
    }

    /// 深拷贝计划、重置全部步骤状态后按名称保存；同名覆盖
    pub fn save_as_template(&mut self, name: &str, plan: &Plan) {
        let mut snapshot = plan.clone();
        snapshot.reset_all();

        self.templates.retain(|t| t.name != name);
        self.templates.push(PlanTemplate {
            name: name.to_string(),
            plan: snapshot,
            created_at: now_millis(),
        });
        self.persist();
    }

    pub fn load_template(&self, name: &str) -> Result<Plan, PlannerError> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.plan.clone())
            .ok_or_else(|| PlannerError::NotFound { kind: "Template", key: name.to_string() })
    }

    pub fn list_templates(&self) -> &[PlanTemplate] {
        &self.templates
    }

    fn persist(&self) {
        match serde_json::to_value(&self.templates) {
            Ok(value) => {
                if let Err(e) = self.store.save(TEMPLATES_KEY, &value) {
                    tracing::warn!(error = %e, "failed to persist templates");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize templates"),
        }
    }
}
