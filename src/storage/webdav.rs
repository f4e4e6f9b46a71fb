use super::{finish, required, StorageConfig};
use crate::error::ConnectionError;
use opendal::Operator;
use std::time::Duration;

/// 把 root 拼接到 endpoint 中（避免 OpenDAL 的 URL 编码问题）
pub(super) fn endpoint(config: &StorageConfig) -> Result<String, ConnectionError> {
    let endpoint = required(&config.webdav_endpoint, "WebDAV storage requires endpoint")?;
    Ok(match config.root.as_deref().filter(|r| !r.is_empty()) {
        Some(root) => format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            root.trim_start_matches('/').trim_end_matches('/')
        ),
        None => endpoint.to_string(),
    })
}

pub(super) fn build(config: &StorageConfig, timeout: Duration) -> Result<Operator, ConnectionError> {
    use opendal::services::Webdav;

    let endpoint = endpoint(config)?;
    let mut builder = Webdav::default().endpoint(&endpoint);
    if let Some(username) = config.username.as_deref().filter(|u| !u.is_empty()) {
        builder = builder.username(username);
    }
    if let Some(password) = config.password.as_deref() {
        builder = builder.password(password);
    }

    tracing::info!("创建WebDAV存储: endpoint={}", endpoint);
    finish(builder, timeout)
}

pub(super) fn is_secure(config: &StorageConfig) -> bool {
    config
        .webdav_endpoint
        .as_deref()
        .is_some_and(|ep| ep.starts_with("https://"))
}
