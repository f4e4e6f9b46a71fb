//! 应用配置模块

use crate::core::comparator::CompareConfig;
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

/// 连接配置，主机可单独覆盖编码和连接数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPreferences {
    /// 连接超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

impl Default for ConnectionPreferences {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_connections: default_max_connections(),
            encoding: default_encoding(),
        }
    }
}

/// 全部偏好设置，启动时加载一次后显式传递
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub connection: ConnectionPreferences,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Preferences {
    /// 从配置文件加载，文件不存在或无法解析时使用默认值
    pub fn load(config_dir: &Path) -> Self {
        let config_file = config_dir.join(CONFIG_FILE);
        let loaded = fs::read_to_string(&config_file)
            .ok()
            .and_then(|content| serde_json::from_str::<Preferences>(&content).ok());
        match loaded {
            Some(preferences) => preferences,
            None => {
                if config_file.exists() {
                    tracing::warn!("配置文件无法解析，使用默认配置: {:?}", config_file);
                }
                Self::default()
            }
        }
    }

    /// 保存配置，保留文件中其他未知的键
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(config_dir)?;
        let config_file = config_dir.join(CONFIG_FILE);

        // 读取现有配置
        let mut config: serde_json::Value = if config_file.exists() {
            let content = fs::read_to_string(&config_file)?;
            serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        let value = serde_json::to_value(self).map_err(io::Error::other)?;
        if let (Some(target), serde_json::Value::Object(updates)) = (config.as_object_mut(), value)
        {
            target.extend(updates);
        } else {
            config = serde_json::to_value(self).map_err(io::Error::other)?;
        }

        let content = serde_json::to_string_pretty(&config).map_err(io::Error::other)?;
        fs::write(&config_file, content)
    }
}

/// 默认配置目录
pub fn config_dir() -> PathBuf {
    crate::dirs::config_dir()
        .map(|p| p.join("remotesync"))
        .unwrap_or_else(|| PathBuf::from(".remotesync"))
}
