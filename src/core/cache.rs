//! 目录列表缓存
//!
//! 按目录缓存会话已列出的子项，供 Find/Attributes 等功能复用，避免重复请求后端。
//! 缓存没有过期策略，只会被同一目录的新列表整体替换，或由会话关闭时清空。

use crate::model::{AttributedList, Path};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// 目录列表缓存，克隆后共享同一份数据
#[derive(Clone)]
pub struct DirectoryCache {
    /// `None` 表示禁用缓存，所有写入都被丢弃
    entries: Option<Arc<RwLock<HashMap<String, AttributedList>>>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self {
            entries: Some(Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    /// 不保存任何内容的缓存，功能对象每次都会实时请求
    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// 整体替换目录的列表
    pub fn put(&self, directory: &Path, list: AttributedList) {
        let Some(entries) = &self.entries else {
            return;
        };
        debug!("缓存目录列表 {} ({} 项)", directory, list.len());
        entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(directory.absolute().to_string(), list);
    }

    /// 未缓存时返回 `None`（不等同于空目录）
    pub fn get(&self, directory: &Path) -> Option<AttributedList> {
        let entries = self.entries.as_ref()?;
        entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(directory.absolute())
            .cloned()
    }

    pub fn is_cached(&self, directory: &Path) -> bool {
        self.entries.as_ref().is_some_and(|entries| {
            entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(directory.absolute())
        })
    }

    pub fn remove(&self, directory: &Path) -> bool {
        let Some(entries) = &self.entries else {
            return false;
        };
        entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(directory.absolute())
            .is_some()
    }

    /// 文件被创建、删除或移动后，丢弃其所在目录和（如果是目录）其下所有列表
    pub fn invalidate(&self, file: &Path) {
        let Some(entries) = &self.entries else {
            return;
        };
        let mut entries = entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = file.parent() {
            entries.remove(parent.absolute());
        }
        let prefix = format!("{}/", file.absolute());
        entries.retain(|key, _| key != file.absolute() && !key.starts_with(&prefix));
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.write().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| {
            entries.read().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DirectoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DirectoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryCache")
            .field("enabled", &self.is_enabled())
            .field("directories", &self.len())
            .finish()
    }
}
