//! 检查点存储
//!
//! create_checkpoint 深拷贝计划并生成新 id；resume_from_checkpoint 返回存储副本的深拷贝，
//! 绝不返回内部引用，调用方对恢复出的计划做任何修改都不影响存储中的快照。

use std::sync::Arc;

use crate::error::PlannerError;
use crate::plan::types::now_millis;
use crate::plan::{Checkpoint, Plan};
use crate::store::KeyValueStore;

pub const CHECKPOINTS_KEY: &str = "planner_checkpoints";

/// 检查点存储：内存索引 + 键值持久化
pub struct CheckpointStore {
    store: Arc<dyn KeyValueStore>,
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointStore {
    /// 构造时从持久化存储水合索引；数据损坏时告警并从空索引开始
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let checkpoints = match store.load(CHECKPOINTS_KEY) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "corrupt checkpoint index, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load checkpoint index");
                Vec::new()
            }
        };
        Self { store, checkpoints }
    }

    /// 深拷贝计划存为检查点，返回新生成的 id
    pub fn create_checkpoint(&mut self, plan: &Plan) -> String {
        let id = format!("ckpt_{}", uuid::Uuid::new_v4());
        self.checkpoints.push(Checkpoint {
            id: id.clone(),
            plan: plan.clone(),
            created_at: now_millis(),
        });
        self.persist();
        id
    }

    /// 按 id 恢复计划（存储副本的深拷贝）；不存在返回 NotFound
    pub fn resume_from_checkpoint(&self, id: &str) -> Result<Plan, PlannerError> {
        self.checkpoints
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.plan.clone())
            .ok_or_else(|| PlannerError::NotFound { kind: "Checkpoint", key: id.to_string() })
    }

    pub fn list_checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    fn persist(&self) {
        // 索引已同步更新；持久化失败只告警，不回滚内存状态
        match serde_json::to_value(&self.checkpoints) {
            Ok(value) => {
                if let Err(e) = self.store.save(CHECKPOINTS_KEY, &value) {
                    tracing::warn!(error = %e, "failed to persist checkpoints");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize checkpoints"),
        }
    }
}
