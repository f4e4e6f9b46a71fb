use super::path::{Checksum, HashAlgorithm, PathType};
use crate::core::checksum;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncRead;

/// 本地文件元数据快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalAttributes {
    pub kind: PathType,
    pub size: Option<u64>,
    /// 修改时间（毫秒时间戳）
    pub modification_date: Option<i64>,
    /// 仅在需要比较校验和时才填充
    pub checksum: Checksum,
}

impl LocalAttributes {
    pub fn is_directory(&self) -> bool {
        self.kind == PathType::Directory
    }
}

/// 本地文件抽象
#[async_trait]
pub trait Local: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn exists(&self) -> bool;

    async fn attributes(&self) -> Result<LocalAttributes>;

    /// 打开内容流
    async fn read(&self) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// 读取全部内容计算校验和
    async fn checksum(&self, algorithm: HashAlgorithm) -> Result<Checksum> {
        let reader = self.read().await?;
        checksum::compute(algorithm, reader).await
    }
}

/// 基于本地文件系统的实现
#[derive(Debug, Clone)]
pub struct FileSystemLocal {
    path: PathBuf,
    name: String,
}

impl FileSystemLocal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl Local for FileSystemLocal {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    async fn attributes(&self) -> Result<LocalAttributes> {
        let metadata = fs::symlink_metadata(&self.path).await?;
        let kind = if metadata.is_dir() {
            PathType::Directory
        } else if metadata.file_type().is_symlink() {
            PathType::Symlink
        } else {
            PathType::File
        };
        let modification_date = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64);

        Ok(LocalAttributes {
            kind,
            size: if metadata.is_dir() {
                None
            } else {
                Some(metadata.len())
            },
            modification_date,
            checksum: Checksum::NONE,
        })
    }

    async fn read(&self) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let file = fs::File::open(&self.path).await?;
        Ok(Box::new(file))
    }
}
