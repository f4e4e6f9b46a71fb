use super::{finish, required, StorageConfig};
use crate::error::ConnectionError;
use opendal::Operator;
use std::time::Duration;

/// 本地目录作为远程存储
pub(super) fn build(config: &StorageConfig, timeout: Duration) -> Result<Operator, ConnectionError> {
    use opendal::services::Fs;

    let path = required(&config.path, "Local storage requires path")?;
    finish(Fs::default().root(path), timeout)
}

/// 连接时创建根目录
pub(super) fn ensure_root(config: &StorageConfig) -> Result<(), ConnectionError> {
    let path = required(&config.path, "Local storage requires path")?;
    std::fs::create_dir_all(path)
        .map_err(|e| ConnectionError::Network(format!("{}: {}", path, e)))?;
    tracing::info!("初始化本地存储: {}", path);
    Ok(())
}

/// 进程内存储，主要用于演示和测试
pub(super) fn build_memory(timeout: Duration) -> Result<Operator, ConnectionError> {
    use opendal::services::Memory;

    finish(Memory::default(), timeout)
}
