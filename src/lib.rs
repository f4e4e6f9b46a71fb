pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod model;
pub mod session;
pub mod storage;

pub use crate::config::Preferences;
pub use crate::core::{
    CompareConfig, Comparison, ComparisonServiceFilter, ComparisonSummary, DirectoryCache,
};
pub use crate::error::{ConnectionError, Result, SessionError};
pub use crate::model::{DescriptiveUrl, Host, Path, PathType, Protocol, TransferItem};
pub use crate::session::{Backend, Session, State};
pub use crate::storage::{OperatorBackend, StorageConfig, StorageType};

/// 平台相关目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
