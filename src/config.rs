//! Configuration loading and management.
//!
//! Tiers, lowest precedence first: built-in defaults, the user config
//! (`~/.taskboard/config.yaml`), the project config
//! (`./.taskboard/config.yaml`), then `TASKBOARD_*` environment variables.
//! An explicit config path replaces the file tiers entirely.

use crate::error::{DashboardError, DashboardResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory holding the config file and, by default, the database.
pub const CONFIG_DIR: &str = ".taskboard";
const CONFIG_FILE: &str = "config.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Storage and HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("tasks.db")
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Listing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Rows per task page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Staff per rollup page.
    #[serde(default = "default_staff_page_size")]
    pub staff_page_size: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            staff_page_size: default_staff_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}

fn default_staff_page_size() -> u32 {
    20
}

/// Where config files are looked up.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub explicit: Option<PathBuf>,
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard locations relative to the working and home directories.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            project_dir: Some(PathBuf::from(CONFIG_DIR)),
            user_dir: dirs::home_dir().map(|h| h.join(CONFIG_DIR)),
        }
    }
}

/// Deep merge `overlay` onto `base`. Objects merge by key, everything else
/// is replaced; a null overlay keeps the base.
fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

fn read_tier(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable config");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping malformed config");
            None
        }
    }
}

impl Config {
    /// Parse one config file.
    pub fn load<P: AsRef<Path>>(path: P) -> DashboardResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| DashboardError::config_missing(path.display().to_string()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| DashboardError::invalid_value("config", e.to_string()))
    }

    /// Resolve configuration from the given locations and the process
    /// environment.
    pub fn resolve(paths: &ConfigPaths) -> DashboardResult<Self> {
        Self::resolve_with_env(paths, |key| std::env::var(key).ok())
    }

    /// [`Config::resolve`] with an injectable environment.
    pub fn resolve_with_env<F>(paths: &ConfigPaths, env: F) -> DashboardResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &paths.explicit {
            Some(path) => Self::load(path)?,
            None => {
                let mut merged = serde_json::to_value(Self::default())
                    .map_err(|e| DashboardError::invalid_value("config", e.to_string()))?;
                for dir in [&paths.user_dir, &paths.project_dir].into_iter().flatten() {
                    if let Some(tier) = read_tier(&dir.join(CONFIG_FILE)) {
                        debug!(dir = %dir.display(), "applying config tier");
                        merged = deep_merge(merged, tier);
                    }
                }
                serde_json::from_value(merged)
                    .map_err(|e| DashboardError::invalid_value("config", e.to_string()))?
            }
        };
        config.apply_env_overrides(env);
        Ok(config)
    }

    fn apply_env_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = env("TASKBOARD_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }
        if let Some(port) = env("TASKBOARD_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "ignoring invalid TASKBOARD_PORT"),
            }
        }
        if let Some(size) = env("TASKBOARD_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(size) if size > 0 => self.dashboard.page_size = size,
                _ => warn!(value = %size, "ignoring invalid TASKBOARD_PAGE_SIZE"),
            }
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn merge_keeps_unset_keys() {
        let merged = deep_merge(
            json!({"server": {"port": 8080, "bind": "127.0.0.1"}}),
            json!({"server": {"port": 9000}}),
        );
        assert_eq!(merged, json!({"server": {"port": 9000, "bind": "127.0.0.1"}}));
    }

    #[test]
    fn defaults_when_no_files() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths {
            explicit: None,
            project_dir: Some(temp.path().join("project")),
            user_dir: Some(temp.path().join("user")),
        };
        let config = Config::resolve_with_env(&paths, no_env).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dashboard.page_size, 50);
        assert_eq!(config.dashboard.staff_page_size, 20);
    }

    #[test]
    fn project_overrides_user() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        let user = temp.path().join("user");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::create_dir_all(&user).unwrap();
        std::fs::write(
            user.join(CONFIG_FILE),
            "server:\n  port: 7000\ndashboard:\n  staff_page_size: 5\n",
        )
        .unwrap();
        std::fs::write(project.join(CONFIG_FILE), "server:\n  port: 9000\n").unwrap();

        let paths = ConfigPaths {
            explicit: None,
            project_dir: Some(project),
            user_dir: Some(user),
        };
        let config = Config::resolve_with_env(&paths, no_env).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dashboard.staff_page_size, 5);
        assert_eq!(config.dashboard.page_size, 50);
    }

    #[test]
    fn env_overrides_files() {
        let paths = ConfigPaths::default();
        let config = Config::resolve_with_env(&paths, |key| match key {
            "TASKBOARD_PORT" => Some("3001".into()),
            "TASKBOARD_PAGE_SIZE" => Some("0".into()),
            "TASKBOARD_DB_PATH" => Some("/tmp/board.db".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.dashboard.page_size, 50);
        assert_eq!(config.server.db_path, PathBuf::from("/tmp/board.db"));
    }

    #[test]
    fn missing_explicit_file_is_config_missing() {
        let paths = ConfigPaths {
            explicit: Some(PathBuf::from("/nonexistent/taskboard.yaml")),
            ..Default::default()
        };
        let err = Config::resolve_with_env(&paths, no_env).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ConfigMissing);
    }
}
