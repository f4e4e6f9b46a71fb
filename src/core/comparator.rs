use super::cache::DirectoryCache;
use super::comparison::{
    ChecksumComparisonService, Comparison, ComparisonService, SizeComparisonService,
    TimestampComparisonService,
};
use crate::error::{Result, SessionError};
use crate::model::{LocalAttributes, PathAttributes, TransferItem};
use crate::session::{Attributes, Backend, Find, Session};
use chrono::{FixedOffset, Offset, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 比较配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareConfig {
    /// 是否先比较校验和（需要读取本地文件）
    #[serde(default)]
    pub hash: bool,
    /// 是否比较文件大小
    #[serde(default = "default_true")]
    pub size: bool,
    /// 比较修改时间时使用的时区（相对 UTC 的秒数）
    #[serde(default)]
    pub time_zone_offset_secs: i32,
    /// 时间容差（秒）
    #[serde(default)]
    pub tolerance_secs: i64,
}

fn default_true() -> bool {
    true
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            hash: false,
            size: true,
            time_zone_offset_secs: 0,
            tolerance_secs: 0,
        }
    }
}

impl CompareConfig {
    /// 非法偏移量回退到 UTC
    pub fn zone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.time_zone_offset_secs).unwrap_or_else(|| Utc.fix())
    }
}

/// 本地文件与远程文件的比较器
///
/// 依次判断存在性、目录、校验和、大小，最后以修改时间兜底。
/// 前面的步骤只有在能得出结论时才返回，否则交给下一步。
pub struct ComparisonServiceFilter<'a, B: Backend> {
    session: &'a Session<B>,
    finder: Arc<dyn Find>,
    attributes: Arc<dyn Attributes>,
    config: CompareConfig,
    checksum: ChecksumComparisonService,
    size: SizeComparisonService,
    timestamp: TimestampComparisonService,
}

impl<'a, B: Backend> ComparisonServiceFilter<'a, B> {
    /// 每次比较都实时查询远程
    pub fn new(session: &'a Session<B>, config: CompareConfig) -> Result<Self> {
        Self::with_cache(session, DirectoryCache::disabled(), config)
    }

    /// 使用给定缓存查询远程，适合批量比较同一目录下的文件
    pub fn with_cache(
        session: &'a Session<B>,
        cache: DirectoryCache,
        config: CompareConfig,
    ) -> Result<Self> {
        let finder = session
            .feature::<dyn Find>()
            .ok_or_else(|| SessionError::unsupported("find"))?
            .with_cache(cache.clone());
        let attributes = session
            .feature::<dyn Attributes>()
            .ok_or_else(|| SessionError::unsupported("attributes"))?
            .with_cache(cache);
        let timestamp =
            TimestampComparisonService::new(config.zone()).with_tolerance(config.tolerance_secs);

        Ok(Self {
            session,
            finder,
            attributes,
            config,
            checksum: ChecksumComparisonService,
            size: SizeComparisonService,
            timestamp,
        })
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub async fn compare(&self, item: &TransferItem) -> Result<Comparison> {
        let remote = &item.remote;
        let local = &item.local;

        if !local.exists().await {
            return Ok(if self.finder.find(remote).await? {
                Comparison::Remote
            } else {
                Comparison::Equal
            });
        }
        if !self.finder.find(remote).await? {
            return Ok(Comparison::Local);
        }
        // 目录不比较时间
        if remote.is_directory() {
            return Ok(Comparison::Equal);
        }

        let remote_attributes = self.attributes.find(remote).await?;
        if remote_attributes.is_directory() {
            return Ok(Comparison::Equal);
        }
        let mut local_attributes = local.attributes().await?;

        if self.config.hash {
            if let Some(result) = self
                .compare_checksum(item, &remote_attributes, &mut local_attributes)
                .await?
            {
                tracing::debug!("校验和比较 {}: {}", remote, result);
                return Ok(result);
            }
        }

        if self.config.size {
            if let (Some(r), Some(l)) = (remote_attributes.size, local_attributes.size) {
                if self.size.compare(&remote_attributes, &local_attributes)
                    == Comparison::NotEqual
                {
                    tracing::debug!("文件大小不同: {} (remote={}, local={})", remote, r, l);
                    return Ok(Comparison::NotEqual);
                }
            }
        }

        let result = self.timestamp.compare(&remote_attributes, &local_attributes);
        tracing::debug!("修改时间比较 {}: {}", remote, result);
        Ok(result)
    }

    /// 远程没有可用校验和，或本地无法按同一算法计算时返回 `None`
    async fn compare_checksum(
        &self,
        item: &TransferItem,
        remote: &PathAttributes,
        local: &mut LocalAttributes,
    ) -> Result<Option<Comparison>> {
        if remote.checksum.is_empty() {
            return Ok(None);
        }
        let Some(algorithm) = remote.checksum.algorithm.filter(|a| a.is_computable()) else {
            tracing::debug!("远程校验和没有可识别的算法，跳过: {}", item.remote);
            return Ok(None);
        };

        self.session
            .message(&format!("计算 {} 的校验和", item.local.name()));
        local.checksum = item.local.checksum(algorithm).await?;
        if local.checksum.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.checksum.compare(remote, local)))
    }

    /// 并发比较多个条目，结果与输入顺序一致
    pub async fn compare_all(
        &self,
        items: &[TransferItem],
        concurrency: usize,
    ) -> Vec<Result<Comparison>> {
        stream::iter(items)
            .map(|item| self.compare(item))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

/// 比较结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub equal_count: usize,
    pub not_equal_count: usize,
    pub local_only_count: usize,
    pub remote_only_count: usize,
    pub failed_count: usize,
}

impl ComparisonSummary {
    pub fn from_results<'r, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'r Result<Comparison>>,
    {
        let mut summary = Self::default();
        for result in results {
            match result {
                Ok(Comparison::Equal) => summary.equal_count += 1,
                Ok(Comparison::NotEqual) => summary.not_equal_count += 1,
                Ok(Comparison::Local) => summary.local_only_count += 1,
                Ok(Comparison::Remote) => summary.remote_only_count += 1,
                Err(_) => summary.failed_count += 1,
            }
        }
        summary
    }

    pub fn total_files(&self) -> usize {
        self.equal_count
            + self.not_equal_count
            + self.local_only_count
            + self.remote_only_count
            + self.failed_count
    }

    /// 需要传输的文件数（不一致或只存在一边）
    pub fn pending_count(&self) -> usize {
        self.not_equal_count + self.local_only_count + self.remote_only_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checksum::compute_bytes;
    use crate::model::{
        Checksum, FileSystemLocal, HashAlgorithm, Host, Local, Path, PathType, Protocol,
    };
    use crate::session::testing::MockBackend;
    use crate::session::ProgressListener;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const MTIME: i64 = 1_700_000_000_000;

    struct Messages(Mutex<Vec<String>>);

    impl ProgressListener for Messages {
        fn message(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn remote_file(absolute: &str, size: u64, mtime: i64, checksum: Checksum) -> Path {
        let mut file = Path::new(absolute, PathType::File);
        let attributes = file.attributes_mut();
        attributes.size = Some(size);
        attributes.modification_date = Some(mtime);
        attributes.checksum = checksum;
        file
    }

    async fn connected(backend: MockBackend) -> Session<MockBackend> {
        backend.add(Path::new("/data", PathType::Directory));
        let session = Session::new(Host::new(Protocol::Memory, "test"), backend);
        session.connect().await.unwrap();
        session
    }

    /// 写入本地文件并把修改时间设为 `MTIME`
    fn local_file(dir: &TempDir, name: &str, content: &[u8]) -> Arc<dyn Local> {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(std::time::UNIX_EPOCH + std::time::Duration::from_millis(MTIME as u64))
            .unwrap();
        Arc::new(FileSystemLocal::new(path))
    }

    fn missing_local(dir: &TempDir, name: &str) -> Arc<dyn Local> {
        Arc::new(FileSystemLocal::new(dir.path().join(name)))
    }

    fn item(remote: &str, local: Arc<dyn Local>) -> TransferItem {
        TransferItem::new(Path::new(remote, PathType::File), local)
    }

    #[tokio::test]
    async fn test_neither_side_exists() {
        let dir = TempDir::new().unwrap();
        let session = connected(MockBackend::new()).await;
        let filter = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        let result = filter
            .compare(&item("/data/none.txt", missing_local(&dir, "none.txt")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::Equal);
    }

    #[tokio::test]
    async fn test_remote_only() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.add_file("/data/a.txt", 3, MTIME);
        let session = connected(backend).await;
        let filter = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", missing_local(&dir, "a.txt")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::Remote);
    }

    #[tokio::test]
    async fn test_local_only() {
        let dir = TempDir::new().unwrap();
        let session = connected(MockBackend::new()).await;
        let filter = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::Local);
    }

    #[tokio::test]
    async fn test_remote_directory_is_equal() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.add(Path::new("/data/sub", PathType::Directory));
        let session = connected(backend).await;
        let filter = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        let result = filter
            .compare(&item("/data/sub", local_file(&dir, "sub", b"not a dir")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::Equal);
    }

    #[tokio::test]
    async fn test_directory_item_skips_attributes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let backend = MockBackend::new();
        backend.add(Path::new("/data/sub", PathType::Directory));
        let session = connected(backend).await;
        let filter = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        let item = TransferItem::new(
            Path::new("/data/sub", PathType::Directory),
            Arc::new(FileSystemLocal::new(dir.path().join("sub"))),
        );
        assert_eq!(filter.compare(&item).await.unwrap(), Comparison::Equal);
        // 只有 Find 请求了一次父目录列表
        assert_eq!(session.backend().list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checksum_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let content = b"same content";
        let sha = compute_bytes(HashAlgorithm::Sha256, content).unwrap();
        let backend = MockBackend::new();
        // 大小和时间都不同，但校验和一致
        backend.add(remote_file("/data/a.txt", 999, MTIME + 60_000, sha));
        let session = connected(backend).await;
        let messages = Arc::new(Messages(Mutex::new(Vec::new())));
        let listener: Arc<dyn ProgressListener> = messages.clone();
        session.add_progress_listener(&listener);

        let config = CompareConfig {
            hash: true,
            ..Default::default()
        };
        let filter = ComparisonServiceFilter::new(&session, config).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", content)))
            .await
            .unwrap();

        assert_eq!(result, Comparison::Equal);
        assert_eq!(*messages.0.lock().unwrap(), vec!["计算 a.txt 的校验和"]);
    }

    #[tokio::test]
    async fn test_md5_checksum_computed_locally() {
        let dir = TempDir::new().unwrap();
        let md5 = compute_bytes(HashAlgorithm::Md5, b"abc").unwrap();
        let backend = MockBackend::new();
        backend.add(remote_file("/data/a.txt", 3, 0, md5));
        let session = connected(backend).await;
        let config = CompareConfig {
            hash: true,
            ..Default::default()
        };
        let filter = ComparisonServiceFilter::new(&session, config).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::Equal);
    }

    #[tokio::test]
    async fn test_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let other = compute_bytes(HashAlgorithm::Blake3, b"other").unwrap();
        let backend = MockBackend::new();
        backend.add(remote_file("/data/a.txt", 3, MTIME, other));
        let session = connected(backend).await;
        let config = CompareConfig {
            hash: true,
            ..Default::default()
        };
        let filter = ComparisonServiceFilter::new(&session, config).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::NotEqual);
    }

    #[tokio::test]
    async fn test_empty_remote_checksum_falls_through() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.add(remote_file("/data/a.txt", 3, MTIME, Checksum::NONE));
        let session = connected(backend).await;
        let messages = Arc::new(Messages(Mutex::new(Vec::new())));
        let listener: Arc<dyn ProgressListener> = messages.clone();
        session.add_progress_listener(&listener);
        let config = CompareConfig {
            hash: true,
            ..Default::default()
        };
        let filter = ComparisonServiceFilter::new(&session, config).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap();

        assert_eq!(result, Comparison::Equal);
        assert!(messages.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_opaque_checksum_falls_through() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.add(remote_file(
            "/data/a.txt",
            3,
            MTIME,
            Checksum::opaque("\"5d41402abc4b2a76\""),
        ));
        let session = connected(backend).await;
        let config = CompareConfig {
            hash: true,
            ..Default::default()
        };
        let filter = ComparisonServiceFilter::new(&session, config).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::Equal);
    }

    #[tokio::test]
    async fn test_size_precedes_timestamp() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.add_file("/data/a.txt", 10, MTIME);
        let session = connected(backend).await;
        let filter = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::NotEqual);
    }

    #[tokio::test]
    async fn test_size_disabled_uses_timestamp() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.add_file("/data/a.txt", 10, MTIME);
        let session = connected(backend).await;
        let config = CompareConfig {
            size: false,
            ..Default::default()
        };
        let filter = ComparisonServiceFilter::new(&session, config).unwrap();
        let result = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap();
        assert_eq!(result, Comparison::Equal);
    }

    #[tokio::test]
    async fn test_timestamp_fallback() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend.add_file("/data/a.txt", 3, MTIME + 5_000);
        let session = connected(backend).await;

        let strict = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        let local = local_file(&dir, "a.txt", b"abc");
        assert_eq!(
            strict.compare(&item("/data/a.txt", local.clone())).await.unwrap(),
            Comparison::NotEqual
        );

        let tolerant = ComparisonServiceFilter::new(
            &session,
            CompareConfig {
                tolerance_secs: 5,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            tolerant.compare(&item("/data/a.txt", local)).await.unwrap(),
            Comparison::Equal
        );
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let session = connected(MockBackend::new()).await;
        let filter = ComparisonServiceFilter::new(&session, CompareConfig::default()).unwrap();
        session.close().await;
        let err = filter
            .compare(&item("/data/a.txt", local_file(&dir, "a.txt", b"abc")))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Connection(_)));
    }

    #[tokio::test]
    async fn test_compare_all_with_shared_cache() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        backend
            .add_file("/data/a.txt", 3, MTIME)
            .add_file("/data/b.txt", 99, MTIME)
            .add_file("/data/r.txt", 1, MTIME);
        let session = connected(backend).await;
        let filter =
            ComparisonServiceFilter::with_cache(&session, session.cache(), CompareConfig::default())
                .unwrap();

        let items = vec![
            item("/data/a.txt", local_file(&dir, "a.txt", b"abc")),
            item("/data/b.txt", local_file(&dir, "b.txt", b"abc")),
            item("/data/l.txt", local_file(&dir, "l.txt", b"abc")),
            item("/data/r.txt", missing_local(&dir, "r.txt")),
        ];
        let results = filter.compare_all(&items, 2).await;
        let verdicts: Vec<Comparison> = results.iter().map(|r| *r.as_ref().unwrap()).collect();
        assert_eq!(
            verdicts,
            vec![
                Comparison::Equal,
                Comparison::NotEqual,
                Comparison::Local,
                Comparison::Remote
            ]
        );

        let summary = ComparisonSummary::from_results(&results);
        assert_eq!(summary.total_files(), 4);
        assert_eq!(summary.pending_count(), 3);
        assert!(session.cache().is_cached(&Path::new("/data", PathType::Directory)));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: CompareConfig = serde_json::from_str(r#"{"hash": true}"#).unwrap();
        assert!(config.hash);
        assert!(config.size);
        assert_eq!(config.tolerance_secs, 0);

        let shifted = CompareConfig {
            time_zone_offset_secs: 8 * 3600,
            ..Default::default()
        };
        assert_eq!(shifted.zone().local_minus_utc(), 8 * 3600);
    }
}
