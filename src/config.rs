//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ARENA__*` 覆盖（双下划线表示嵌套，如 `ARENA__STORE__BACKEND=file`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub agents: AgentsSection,
    #[serde(default)]
    pub store: StoreSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [agents] 段：单次调用超时与各阶段路径
#[derive(Debug, Clone, Deserialize)]
pub struct AgentsSection {
    /// 单个 Agent 调用超时（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_start_path")]
    pub start_path: String,
    #[serde(default = "default_move_path")]
    pub move_path: String,
    #[serde(default = "default_end_path")]
    pub end_path: String,
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_start_path() -> String {
    "start".to_string()
}

fn default_move_path() -> String {
    "move".to_string()
}

fn default_end_path() -> String {
    "end".to_string()
}

impl Default for AgentsSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            start_path: default_start_path(),
            move_path: default_move_path(),
            end_path: default_end_path(),
        }
    }
}

impl AgentsSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// 进程内，不落盘
    #[default]
    Inmem,
    /// 每局一个 JSONL 文件
    File,
}

/// [store] 段：后端与保存目录（仅 file 后端使用）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,
    pub save_dir: Option<PathBuf>,
}

impl StoreSection {
    /// 未配置时为 `$HOME/.battlesnake/games`，无 HOME 时退回当前目录
    pub fn resolved_save_dir(&self) -> PathBuf {
        if let Some(dir) = &self.save_dir {
            return dir.clone();
        }
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".battlesnake").join("games")
    }
}

/// 从 config 目录加载配置，环境变量 ARENA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ARENA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
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
        config::Environment::with_prefix("ARENA")
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
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agents.timeout(), Duration::from_millis(500));
        assert_eq!(cfg.agents.move_path, "move");
        assert_eq!(cfg.store.backend, StoreBackend::Inmem);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(
            &path,
            "[agents]\ntimeout_ms = 150\n\n[store]\nbackend = \"file\"\nsave_dir = \"/tmp/arena-games\"\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.agents.timeout_ms, 150);
        assert_eq!(cfg.agents.end_path, "end");
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.store.resolved_save_dir(), PathBuf::from("/tmp/arena-games"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(&path, "[store]\nbackend = \"redis\"\n").unwrap();
        assert!(load_config(Some(path)).is_err());
    }

    #[test]
    fn test_default_save_dir_under_home() {
        let section = StoreSection::default();
        assert!(section
            .resolved_save_dir()
            .ends_with(PathBuf::from(".battlesnake").join("games")));
    }
}
