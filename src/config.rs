//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `LISA__*` 覆盖（双下划线表示嵌套，
//! 如 `LISA__LLM__MODEL=gpt-4o`）。API Key 的解析也在本层完成（配置项优先于
//! OPENAI_API_KEY 环境变量），LLM 客户端本身不读环境。

use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::ReplanConfig;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PlannerConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub replan: ReplanSection,
    #[serde(default)]
    pub store: StoreSection,
}

/// [llm] 段：模型、端点与 API Key
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            api_key: None,
        }
    }
}

impl LlmSection {
    /// 配置项优先，其次 OPENAI_API_KEY 环境变量；都没有则返回 None
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()))
    }
}

/// [replan] 段：重规划策略与单步超时
#[derive(Debug, Clone, Deserialize)]
pub struct ReplanSection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// 修订计划是否继承上一轮等价步骤的完成结果
    #[serde(default)]
    pub carry_completed: bool,
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

fn default_max_attempts() -> usize {
    3
}

fn default_step_timeout_secs() -> u64 {
    60
}

impl Default for ReplanSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            carry_completed: false,
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

impl From<&ReplanSection> for ReplanConfig {
    fn from(section: &ReplanSection) -> Self {
        Self {
            max_attempts: section.max_attempts,
            carry_completed: section.carry_completed,
        }
    }
}

/// [store] 段：检查点 / 模板持久化目录
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

/// 从 config 目录加载配置，环境变量 LISA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 LISA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<PlannerConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LISA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = PlannerConfig::default();
        assert_eq!(cfg.replan.max_attempts, 3);
        assert!(!cfg.replan.carry_completed);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn configured_key_wins_over_env() {
        let section = LlmSection {
            model: default_model(),
            base_url: None,
            api_key: Some("sk-from-config".to_string()),
        };
        assert_eq!(section.resolve_api_key().as_deref(), Some("sk-from-config"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let section = LlmSection {
            model: default_model(),
            base_url: None,
            api_key: Some("   ".to_string()),
        };
        // 环境里可能有 OPENAI_API_KEY，只断言空白配置不会被当成有效 Key
        assert_ne!(section.resolve_api_key().as_deref(), Some("   "));
    }
}
