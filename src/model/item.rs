use super::local::{FileSystemLocal, Local};
use super::path::{Path, PathType};
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use walkdir::WalkDir;

/// 远程路径与其本地对应文件
#[derive(Debug, Clone)]
pub struct TransferItem {
    pub remote: Path,
    pub local: Arc<dyn Local>,
}

impl TransferItem {
    pub fn new(remote: Path, local: Arc<dyn Local>) -> Self {
        Self { remote, local }
    }

    /// 遍历本地目录，为每个条目生成对应 `remote_root` 下的远程路径
    pub async fn walk(local_root: impl Into<PathBuf>, remote_root: &Path) -> Result<Vec<Self>> {
        let local_root = local_root.into();
        let remote_root = remote_root.clone();

        // 使用 spawn_blocking 避免阻塞 async runtime
        let items = tokio::task::spawn_blocking(move || {
            WalkDir::new(&local_root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter_map(|entry| {
                    let relative = entry.path().strip_prefix(&local_root).ok()?.to_str()?;
                    // 跳过根目录本身
                    if relative.is_empty() {
                        return None;
                    }
                    let kind = if entry.file_type().is_dir() {
                        PathType::Directory
                    } else {
                        PathType::File
                    };
                    let remote = remote_root.child(&relative.replace('\\', "/"), kind);
                    let local: Arc<dyn Local> = Arc::new(FileSystemLocal::new(entry.path()));
                    Some(TransferItem::new(remote, local))
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(anyhow::Error::from)?;

        Ok(items)
    }
}
