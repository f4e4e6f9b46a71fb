//! 可选功能及其注册表
//!
//! 后端在会话创建时把自己支持的功能注册进 [`FeatureRegistry`]，调用方通过
//! `session.feature::<dyn Find>()` 之类的类型化查询获取；不支持时得到 `None`。
//! 每个功能都可以通过 `with_cache` 绑定一个 [`DirectoryCache`]，先查缓存再请求后端。

use crate::core::cache::DirectoryCache;
use crate::error::{Result, SessionError};
use crate::model::{AttributedList, DescriptiveUrl, Path, PathAttributes, PathType};
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 根目录的固定 id
pub const ROOT_FILE_ID: &str = "root";

/// 实时列出目录
#[async_trait]
pub trait ListService: Send + Sync {
    async fn list(&self, directory: &Path) -> Result<AttributedList>;
}

/// 判断远程路径是否存在
#[async_trait]
pub trait Find: Send + Sync {
    async fn find(&self, file: &Path) -> Result<bool>;

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Find>;
}

/// 读取远程路径的元数据
#[async_trait]
pub trait Attributes: Send + Sync {
    async fn find(&self, file: &Path) -> Result<PathAttributes>;

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Attributes>;
}

/// 路径到后端文件 id 的映射（如云盘）
#[async_trait]
pub trait IdProvider: Send + Sync {
    async fn file_id(&self, file: &Path) -> Result<String>;

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn IdProvider>;
}

#[async_trait]
pub trait Delete: Send + Sync {
    async fn delete(&self, files: &[Path]) -> Result<()>;

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Delete>;
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn mkdir(&self, folder: &Path) -> Result<Path>;

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Directory>;
}

#[async_trait]
pub trait Move: Send + Sync {
    async fn rename(&self, file: &Path, target: &Path) -> Result<Path>;

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Move>;
}

/// 后端特有的访问地址，例如对象存储的公开 URL
pub trait UrlProvider: Send + Sync {
    fn to_url(&self, file: &Path) -> Vec<DescriptiveUrl>;
}

/// 按功能 trait 的类型索引的注册表
#[derive(Default)]
pub struct FeatureRegistry {
    features: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册功能，同一类型重复注册时后者覆盖前者
    pub fn register<F>(&mut self, feature: Arc<F>)
    where
        F: ?Sized + Send + Sync + 'static,
    {
        self.features.insert(TypeId::of::<F>(), Box::new(feature));
    }

    pub fn get<F>(&self) -> Option<Arc<F>>
    where
        F: ?Sized + Send + Sync + 'static,
    {
        self.features
            .get(&TypeId::of::<F>())?
            .downcast_ref::<Arc<F>>()
            .cloned()
    }

    pub fn contains<F>(&self) -> bool
    where
        F: ?Sized + 'static,
    {
        self.features.contains_key(&TypeId::of::<F>())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// 在父目录列表中查找文件，优先使用缓存，未命中时实时列出并写入缓存
///
/// 父目录本身不存在时返回 `Ok(None)`。
pub async fn lookup(
    lister: &dyn ListService,
    cache: &DirectoryCache,
    file: &Path,
) -> Result<Option<Path>> {
    let Some(parent) = file.parent() else {
        return Ok(None);
    };
    let list = match cache.get(&parent) {
        Some(list) => list,
        None => {
            debug!("缓存未命中，列出目录 {}", parent);
            match lister.list(&parent).await {
                Ok(list) => {
                    cache.put(&parent, list.clone());
                    list
                }
                Err(SessionError::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    };
    Ok(list.get(file).cloned())
}

/// 基于目录列表的存在性判断
pub struct DefaultFindFeature {
    lister: Arc<dyn ListService>,
    cache: DirectoryCache,
}

impl DefaultFindFeature {
    pub fn new(lister: Arc<dyn ListService>) -> Self {
        Self {
            lister,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl Find for DefaultFindFeature {
    async fn find(&self, file: &Path) -> Result<bool> {
        if file.is_root() {
            return Ok(true);
        }
        Ok(lookup(self.lister.as_ref(), &self.cache, file).await?.is_some())
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Find> {
        Arc::new(Self {
            lister: self.lister.clone(),
            cache,
        })
    }
}

/// 基于目录列表的元数据读取
pub struct DefaultAttributesFeature {
    lister: Arc<dyn ListService>,
    cache: DirectoryCache,
}

impl DefaultAttributesFeature {
    pub fn new(lister: Arc<dyn ListService>) -> Self {
        Self {
            lister,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl Attributes for DefaultAttributesFeature {
    async fn find(&self, file: &Path) -> Result<PathAttributes> {
        if file.is_root() {
            return Ok(PathAttributes::new(PathType::Directory));
        }
        lookup(self.lister.as_ref(), &self.cache, file)
            .await?
            .map(|found| found.attributes().clone())
            .ok_or_else(|| SessionError::not_found(file.absolute()))
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn Attributes> {
        Arc::new(Self {
            lister: self.lister.clone(),
            cache,
        })
    }
}

/// 从父目录列表里读取文件 id；列表里没有 id 时使用绝对路径
pub struct DefaultIdProvider {
    lister: Arc<dyn ListService>,
    cache: DirectoryCache,
}

impl DefaultIdProvider {
    pub fn new(lister: Arc<dyn ListService>) -> Self {
        Self {
            lister,
            cache: DirectoryCache::disabled(),
        }
    }
}

#[async_trait]
impl IdProvider for DefaultIdProvider {
    async fn file_id(&self, file: &Path) -> Result<String> {
        if let Some(id) = file.attributes().version_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }
        if file.is_root() {
            return Ok(ROOT_FILE_ID.to_string());
        }
        let found = lookup(self.lister.as_ref(), &self.cache, file)
            .await?
            .ok_or_else(|| SessionError::not_found(file.absolute()))?;
        Ok(found
            .attributes()
            .version_id
            .clone()
            .unwrap_or_else(|| found.absolute().to_string()))
    }

    fn with_cache(&self, cache: DirectoryCache) -> Arc<dyn IdProvider> {
        Arc::new(Self {
            lister: self.lister.clone(),
            cache,
        })
    }
}

/// 注册基于列表的 Find/Attributes/IdProvider
pub fn register_listing_features(features: &mut FeatureRegistry, lister: Arc<dyn ListService>) {
    features.register::<dyn Find>(Arc::new(DefaultFindFeature::new(lister.clone())));
    features.register::<dyn Attributes>(Arc::new(DefaultAttributesFeature::new(lister.clone())));
    features.register::<dyn IdProvider>(Arc::new(DefaultIdProvider::new(lister)));
}
