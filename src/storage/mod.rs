//! 基于 OpenDAL 的存储后端
//!
//! 远程绝对路径 `/a/b` 对应 operator 内的相对路径 `a/b`，目录以 `/` 结尾。

pub mod features;
pub mod local;
pub mod s3;
pub mod webdav;

use crate::error::{ConnectionError, Result, SessionError};
use crate::model::{
    AttributedList, Checksum, Credentials, HashAlgorithm, Host, Path, PathAttributes, PathType,
    Protocol,
};
use crate::session::{
    Attributes, Backend, Capabilities, Connection, Delete, Directory, FeatureRegistry, Find,
    Move, Transcript, UrlProvider,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use opendal::layers::TimeoutLayer;
use opendal::{Metadata, Metakey, Operator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use features::{
    OperatorAttributes, OperatorDelete, OperatorDirectory, OperatorFind, OperatorMove,
    OperatorUrlProvider,
};

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- stat, delete 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- read, write 等
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 存储类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Local,
    Memory,
    S3,
    WebDav,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub typ: StorageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webdav_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl StorageConfig {
    pub fn new(typ: StorageType) -> Self {
        Self {
            typ,
            path: None,
            bucket: None,
            region: None,
            access_key: None,
            secret_key: None,
            endpoint: None,
            prefix: None,
            webdav_endpoint: None,
            username: None,
            password: None,
            root: None,
        }
    }

    /// 会话使用的主机描述
    pub fn to_host(&self) -> Host {
        match self.typ {
            StorageType::Local => Host::new(Protocol::Local, "localhost"),
            StorageType::Memory => Host::new(Protocol::Memory, "memory"),
            StorageType::S3 => {
                let mut host = Host::new(
                    Protocol::S3,
                    self.bucket.clone().unwrap_or_default(),
                );
                if let Some(key) = &self.access_key {
                    host = host.with_credentials(Credentials {
                        username: key.clone(),
                        password: self.secret_key.clone(),
                    });
                }
                host
            }
            StorageType::WebDav => {
                let endpoint = self.webdav_endpoint.as_deref().unwrap_or_default();
                let hostname = endpoint
                    .split_once("://")
                    .map_or(endpoint, |(_, rest)| rest)
                    .split('/')
                    .next()
                    .unwrap_or_default();
                let mut host = Host::new(Protocol::WebDav, hostname);
                if let Some(username) = &self.username {
                    host = host.with_credentials(Credentials {
                        username: username.clone(),
                        password: self.password.clone(),
                    });
                }
                host
            }
        }
    }
}

fn required<'a>(value: &'a Option<String>, message: &str) -> std::result::Result<&'a str, ConnectionError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConnectionError::Protocol(message.to_string()))
}

/// 添加超时层并生成 operator
fn finish<B: opendal::Builder>(
    builder: B,
    timeout: Duration,
) -> std::result::Result<Operator, ConnectionError> {
    let operator = Operator::new(builder)
        .map_err(|e| ConnectionError::Protocol(e.to_string()))?
        .layer(
            TimeoutLayer::default()
                .with_timeout(timeout)
                .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
        )
        .finish();
    Ok(operator)
}

/// 远程绝对路径转为 operator 路径
pub fn to_operator_path(path: &Path) -> String {
    if path.is_root() {
        return "/".to_string();
    }
    let relative = path.absolute().trim_start_matches('/');
    if path.is_directory() {
        format!("{}/", relative)
    } else {
        relative.to_string()
    }
}

/// operator 路径转为远程绝对路径
pub fn from_operator_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

/// 单段上传的 S3 ETag 就是内容的 MD5；分段上传的 ETag 带 `-N` 后缀
fn is_md5_etag(etag: &str) -> bool {
    etag.len() == 32 && etag.chars().all(|c| c.is_ascii_hexdigit())
}

/// Content-MD5 优先，其次是 ETag
fn checksum_of(meta: &Metadata) -> Checksum {
    if let Some(md5) = meta.content_md5().filter(|m| !m.is_empty()) {
        return Checksum::new(HashAlgorithm::Md5, md5);
    }
    match meta.etag().map(|e| e.trim_matches('"')).filter(|e| !e.is_empty()) {
        Some(etag) if is_md5_etag(etag) => Checksum::new(HashAlgorithm::Md5, etag),
        Some(etag) => Checksum::opaque(etag),
        None => Checksum::NONE,
    }
}

pub(crate) fn attributes_of(meta: &Metadata) -> PathAttributes {
    let kind = if meta.is_dir() {
        PathType::Directory
    } else {
        PathType::File
    };
    let mut attributes = PathAttributes::new(kind);
    if !meta.is_dir() {
        attributes.size = Some(meta.content_length());
    }
    attributes.modification_date = meta.last_modified().map(|t| t.timestamp_millis());
    attributes.checksum = checksum_of(meta);
    attributes.version_id = meta.version().map(str::to_string);
    attributes
}

/// OpenDAL 错误转换，NotFound 单独保留
pub(crate) fn map_error(path: &Path, e: opendal::Error) -> SessionError {
    match e.kind() {
        opendal::ErrorKind::NotFound => SessionError::not_found(path.absolute()),
        opendal::ErrorKind::Unsupported => SessionError::unsupported(e.to_string()),
        _ => SessionError::Background(e.into()),
    }
}

/// 基于 OpenDAL operator 的后端
#[derive(Debug, Clone)]
pub struct OperatorBackend {
    config: StorageConfig,
    timeout: Duration,
}

impl OperatorBackend {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            timeout: Duration::from_secs(OP_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn build(&self) -> std::result::Result<Operator, ConnectionError> {
        match self.config.typ {
            StorageType::Local => local::build(&self.config, self.timeout),
            StorageType::Memory => local::build_memory(self.timeout),
            StorageType::S3 => s3::build(&self.config, self.timeout),
            StorageType::WebDav => webdav::build(&self.config, self.timeout),
        }
    }
}

#[async_trait]
impl Backend for OperatorBackend {
    type Client = Operator;

    async fn connect(
        &self,
        host: &Host,
        transcript: &Transcript,
    ) -> std::result::Result<Operator, ConnectionError> {
        transcript.log(true, &format!("Connect {}", host));
        if self.config.typ == StorageType::Local {
            local::ensure_root(&self.config)?;
        }
        self.build()
    }

    /// 列出根目录以验证凭证和地址
    async fn login(
        &self,
        client: &Operator,
        host: &Host,
        transcript: &Transcript,
    ) -> std::result::Result<(), ConnectionError> {
        transcript.log(true, "List /");
        match client.list("/").await {
            Ok(_) => {
                transcript.log(false, &format!("Login successful for {}", host));
                Ok(())
            }
            Err(e) => {
                transcript.log(false, &e.to_string());
                Err(match e.kind() {
                    opendal::ErrorKind::PermissionDenied => ConnectionError::Login(e.to_string()),
                    opendal::ErrorKind::ConfigInvalid => ConnectionError::Protocol(e.to_string()),
                    _ => ConnectionError::Network(e.to_string()),
                })
            }
        }
    }

    /// operator 没有持久连接，释放句柄即可
    async fn logout(&self, _client: &Operator, transcript: &Transcript) -> Result<()> {
        transcript.log(true, "Disconnect");
        Ok(())
    }

    async fn list(&self, client: &Operator, directory: &Path) -> Result<AttributedList> {
        let operator_path = to_operator_path(&Path::new(directory.absolute(), PathType::Directory));
        tracing::debug!("列出目录 {}", directory);

        let mut lister = client
            .lister_with(&operator_path)
            .metakey(
                Metakey::ContentLength
                    | Metakey::LastModified
                    | Metakey::Mode
                    | Metakey::Etag
                    | Metakey::ContentMd5
                    | Metakey::Version,
            )
            .await
            .map_err(|e| map_error(directory, e))?;

        let mut children = Vec::new();
        while let Some(entry) = lister.try_next().await.map_err(|e| map_error(directory, e))? {
            let absolute = from_operator_path(entry.path());
            // 跳过目录自身
            if absolute == directory.absolute() {
                continue;
            }
            children.push(Path::with_attributes(&absolute, attributes_of(entry.metadata())));
        }

        // OpenDAL 把不存在的前缀列为空目录
        if children.is_empty() && !directory.is_root() {
            client
                .stat(&operator_path)
                .await
                .map_err(|e| map_error(directory, e))?;
        }
        Ok(AttributedList::new(children))
    }

    async fn noop(&self, client: &Operator) -> Result<()> {
        client
            .list("/")
            .await
            .map(|_| ())
            .map_err(|e| map_error(&Path::root(), e))
    }

    fn capabilities(&self) -> Capabilities {
        let Ok(operator) = self.build() else {
            return Capabilities::default();
        };
        let cap = operator.info().full_capability();
        Capabilities {
            create_folder: cap.create_dir,
            create_file: cap.write,
            rename: cap.rename || (cap.copy && cap.delete),
            acl: false,
            unix_permissions: false,
            read_timestamp: cap.stat,
            write_timestamp: false,
            checksum: self.config.typ == StorageType::S3,
            revert: false,
            send_command: false,
            archive: false,
            unarchive: false,
            download_resumable: cap.read,
            upload_resumable: cap.write_can_append,
            create_symlink: false,
            metadata: false,
        }
    }

    fn is_secure(&self, _host: &Host) -> bool {
        match self.config.typ {
            StorageType::S3 => s3::is_secure(&self.config),
            StorageType::WebDav => webdav::is_secure(&self.config),
            StorageType::Local | StorageType::Memory => false,
        }
    }

    fn register_features(&self, features: &mut FeatureRegistry, connection: &Connection<Self>) {
        crate::session::features::register_listing_features(
            features,
            Arc::new(connection.clone()),
        );
        features.register::<dyn Find>(Arc::new(OperatorFind::new(connection.clone())));
        features.register::<dyn Attributes>(Arc::new(OperatorAttributes::new(connection.clone())));
        features.register::<dyn Delete>(Arc::new(OperatorDelete::new(connection.clone())));
        features.register::<dyn Directory>(Arc::new(OperatorDirectory::new(connection.clone())));
        features.register::<dyn Move>(Arc::new(OperatorMove::new(connection.clone())));
        if matches!(self.config.typ, StorageType::S3 | StorageType::WebDav) {
            features.register::<dyn UrlProvider>(Arc::new(OperatorUrlProvider::new(
                self.config.clone(),
            )));
        }
    }
}
