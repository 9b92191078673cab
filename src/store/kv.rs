//! 通用键值持久化契约
//!
//! save(key, value) / load(key)，实现负责具体介质：JsonFileStore 每键一个 JSON 文件，
//! MemoryStore 仅内存（测试用）。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

/// 键值存储 trait：键到 JSON 值
pub trait KeyValueStore: Send + Sync {
    fn save(&self, key: &str, value: &Value) -> anyhow::Result<()>;

    /// 键不存在时返回 Ok(None)
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>>;
}

/// 文件存储：`<dir>/<key>.json`，父目录不存在时自动创建
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn save(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string_pretty(value)?;
        std::fs::write(self.path_for(key), data)?;
        Ok(())
    }

    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

/// 内存存储（测试用）
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn save(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.load("missing").unwrap().is_none());

        let value = serde_json::json!({"a": 1, "b": ["x", "y"]});
        store.save("sample", &value).unwrap();
        assert_eq!(store.load("sample").unwrap(), Some(value));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        let value = serde_json::json!([1, 2, 3]);
        store.save("k", &value).unwrap();
        assert_eq!(store.load("k").unwrap(), Some(value));
        assert!(store.load("other").unwrap().is_none());
    }
}
