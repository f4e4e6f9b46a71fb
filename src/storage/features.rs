//! OpenDAL 后端的功能实现
//!
//! 查询类功能优先使用缓存中的父目录列表，未缓存时直接 stat；
//! 修改类功能完成后使受影响的目录列表失效。S3 与 WebDAV 额外提供直接访问地址。

use super::{
    attributes_of, map_error, to_operator_path, webdav, OperatorBackend, StorageConfig,
    StorageType,
};
use crate::core::cache::DirectoryCache;
use crate::error::{Result, SessionError};
use crate::model::url::encode_path;
use crate::model::{DescriptiveUrl, Path, PathAttributes, PathType, UrlType};
use crate::session::{Attributes, Connection, Delete, Directory, Find, Move, UrlProvider};
use async_trait::async_trait;
use opendal::{ErrorKind, Metadata, Operator};
use std::sync::Arc;
use tracing::{debug, info};

/// stat 文件；类型未知的路径再按目录尝试一次（对象存储的目录以 `/` 结尾）
async fn stat(operator: &Operator, file: &Path) -> Result<Option<Metadata>> {
    match operator.stat(&to_operator_path(file)).await {
        Ok(meta) => return Ok(Some(meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(map_error(file, e)),
    }
    if file.is_directory() {
        return Ok(None);
    }
    let as_directory = Path::new(file.absolute(), PathType::Directory);
    match operator.stat(&to_operator_path(&as_directory)).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(map_error(file, e)),
    }
}

/// 缓存中父目录列表里的条目；父目录未缓存时为 `None`
fn cached(cache: &DirectoryCache, file: &Path) -> Option<Option<Path>> {
    let list = cache.get(&file.parent()?)?;
    Some(list.get(file).cloned())
}

pub struct OperatorFind {
    connection: Connection<OperatorBackend>,
    cache: DirectoryCache,
}

impl OperatorFind {
    pub fn new(connection: Connection<OperatorBackend>) -> Self {
        Self {
            connection,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl Find for OperatorFind {
    async fn find(&self, file: &Path) -> Result<bool> {
        if file.is_root() {
            return Ok(true);
        }
        if let Some(found) = cached(&self.cache, file) {
            return Ok(found.is_some());
        }
        let operator = self.connection.client()?;
        Ok(stat(&operator, file).await?.is_some())
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Find> {
        Arc::new(Self {
            connection: self.connection.clone(),
            cache,
        })
    }
}

pub struct OperatorAttributes {
    connection: Connection<OperatorBackend>,
    cache: DirectoryCache,
}

impl OperatorAttributes {
    pub fn new(connection: Connection<OperatorBackend>) -> Self {
        Self {
            connection,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl Attributes for OperatorAttributes {
    async fn find(&self, file: &Path) -> Result<PathAttributes> {
        if file.is_root() {
            return Ok(PathAttributes::new(PathType::Directory));
        }
        let found = match cached(&self.cache, file) {
            Some(found) => found.map(|f| f.attributes().clone()),
            None => {
                let operator = self.connection.client()?;
                stat(&operator, file).await?.map(|meta| attributes_of(&meta))
            }
        };
        found.ok_or_else(|| SessionError::not_found(file.absolute()))
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Attributes> {
        Arc::new(Self {
            connection: self.connection.clone(),
            cache,
        })
    }
}

pub struct OperatorDelete {
    connection: Connection<OperatorBackend>,
    cache: DirectoryCache,
}

impl OperatorDelete {
    pub fn new(connection: Connection<OperatorBackend>) -> Self {
        Self {
            connection,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl Delete for OperatorDelete {
    /// 目录会被递归删除；不存在的文件视为已删除
    async fn delete(&self, files: &[Path]) -> Result<()> {
        let operator = self.connection.client()?;
        for file in files {
            let path = to_operator_path(file);
            let result = if file.is_directory() {
                operator.remove_all(&path).await
            } else {
                operator.delete(&path).await
            };
            match result {
                Ok(()) => info!("已删除 {}", file),
                Err(e) if e.kind() == ErrorKind::NotFound => debug!("文件不存在，跳过删除: {}", file),
                Err(e) => return Err(map_error(file, e)),
            }
            self.cache.invalidate(file);
        }
        Ok(())
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Delete> {
        Arc::new(Self {
            connection: self.connection.clone(),
            cache,
        })
    }
}

pub struct OperatorDirectory {
    connection: Connection<OperatorBackend>,
    cache: DirectoryCache,
}

impl OperatorDirectory {
    pub fn new(connection: Connection<OperatorBackend>) -> Self {
        Self {
            connection,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl Directory for OperatorDirectory {
    async fn mkdir(&self, folder: &Path) -> Result<Path> {
        let operator = self.connection.client()?;
        let folder = Path::new(folder.absolute(), PathType::Directory);
        operator
            .create_dir(&to_operator_path(&folder))
            .await
            .map_err(|e| map_error(&folder, e))?;
        self.cache.invalidate(&folder);
        info!("已创建目录 {}", folder);
        Ok(folder)
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Directory> {
        Arc::new(Self {
            connection: self.connection.clone(),
            cache,
        })
    }
}

pub struct OperatorMove {
    connection: Connection<OperatorBackend>,
    cache: DirectoryCache,
}

impl OperatorMove {
    pub fn new(connection: Connection<OperatorBackend>) -> Self {
        Self {
            connection,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl Move for OperatorMove {
    /// 只支持文件；后端不支持 rename 时退化为复制后删除
    async fn rename(&self, file: &Path, target: &Path) -> Result<Path> {
        if file.is_directory() {
            return Err(SessionError::unsupported(format!("move directory {}", file)));
        }
        let operator = self.connection.client()?;
        let from = to_operator_path(file);
        let to = to_operator_path(&Path::new(target.absolute(), PathType::File));
        let cap = operator.info().full_capability();

        if cap.rename {
            operator.rename(&from, &to).await.map_err(|e| map_error(file, e))?;
        } else if cap.copy && cap.delete {
            operator.copy(&from, &to).await.map_err(|e| map_error(file, e))?;
            operator.delete(&from).await.map_err(|e| map_error(file, e))?;
        } else {
            return Err(SessionError::unsupported(format!("move {}", file)));
        }

        self.cache.invalidate(file);
        self.cache.invalidate(target);
        info!("已移动 {} -> {}", file, target);
        Ok(Path::with_attributes(
            target.absolute(),
            file.attributes().clone(),
        ))
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Move> {
        Arc::new(Self {
            connection: self.connection.clone(),
            cache,
        })
    }
}

/// 对象存储与 WebDAV 的直接访问地址，只根据配置拼接，不发起请求
pub struct OperatorUrlProvider {
    config: StorageConfig,
}

impl OperatorUrlProvider {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn base(&self) -> Option<String> {
        match self.config.typ {
            StorageType::S3 => {
                let bucket = self.config.bucket.as_deref().filter(|b| !b.is_empty())?;
                let mut base = match self.config.endpoint.as_deref().filter(|e| !e.is_empty()) {
                    Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
                    None => match self.config.region.as_deref().filter(|r| !r.is_empty()) {
                        Some(region) => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
                        None => format!("https://{}.s3.amazonaws.com", bucket),
                    },
                };
                if let Some(prefix) = self.config.prefix.as_deref().map(|p| p.trim_matches('/')) {
                    if !prefix.is_empty() {
                        base = format!("{}/{}", base, prefix);
                    }
                }
                Some(base)
            }
            StorageType::WebDav => webdav::endpoint(&self.config)
                .ok()
                .map(|e| e.trim_end_matches('/').to_string()),
            StorageType::Local | StorageType::Memory => None,
        }
    }
}

impl UrlProvider for OperatorUrlProvider {
    fn to_url(&self, file: &Path) -> Vec<DescriptiveUrl> {
        let Some(base) = self.base() else {
            return Vec::new();
        };
        let scheme = base.split_once("://").map_or("HTTP", |(s, _)| s).to_uppercase();
        vec![DescriptiveUrl::new(
            format!("{}{}", base, encode_path(file.absolute())),
            UrlType::Http,
            format!("{} URL", scheme),
        )]
    }
}
