//! 存储层：通用键值持久化 + 检查点 / 模板存储
//!
//! 两个存储在构造时从键值存储水合内存索引，跨进程重启仍可恢复；
//! 写入先同步更新内存索引，持久化相对索引更新为 fire-and-forget。

pub mod checkpoint;
pub mod kv;
pub mod template;

pub use checkpoint::{CheckpointStore, CHECKPOINTS_KEY};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use template::{TemplateStore, TEMPLATES_KEY};
