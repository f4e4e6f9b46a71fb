use super::{finish, required, StorageConfig};
use crate::error::ConnectionError;
use opendal::Operator;
use std::time::Duration;

/// 根据配置创建 S3 operator，不会发起网络请求
pub(super) fn build(config: &StorageConfig, timeout: Duration) -> Result<Operator, ConnectionError> {
    use opendal::services::S3;

    let bucket = required(&config.bucket, "S3 storage requires bucket")?;
    let region = required(&config.region, "S3 storage requires region")?;
    let access_key = required(&config.access_key, "S3 storage requires accessKey")?;
    let secret_key = required(&config.secret_key, "S3 storage requires secretKey")?;

    let mut builder = S3::default()
        .bucket(bucket)
        .region(region)
        .access_key_id(access_key)
        .secret_access_key(secret_key);

    if let Some(ep) = config.endpoint.as_deref().filter(|ep| !ep.is_empty()) {
        builder = builder.endpoint(ep);
    }

    if let Some(p) = config.prefix.as_deref().filter(|p| !p.is_empty()) {
        builder = builder.root(p);
    }

    tracing::info!("初始化S3存储: bucket={}, region={}", bucket, region);
    finish(builder, timeout)
}

/// 未指定 endpoint 时使用 AWS 的 https 地址
pub(super) fn is_secure(config: &StorageConfig) -> bool {
    config
        .endpoint
        .as_deref()
        .filter(|ep| !ep.is_empty())
        .map_or(true, |ep| ep.starts_with("https://"))
}
