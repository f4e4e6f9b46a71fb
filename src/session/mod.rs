//! 会话：单个后端连接的生命周期、目录缓存与事件广播
//!
//! 状态严格按 `Closed -> Opening -> Open -> Closing -> Closed` 变化，
//! 是否已连接只取决于是否持有后端连接句柄。

pub mod backend;
pub mod capabilities;
pub mod features;
pub mod listener;

pub use backend::{Backend, Connection};
pub use capabilities::{Capabilities, Capability};
pub use features::{
    Attributes, DefaultAttributesFeature, DefaultFindFeature, DefaultIdProvider, Delete,
    Directory, FeatureRegistry, Find, IdProvider, ListService, Move, UrlProvider,
};
pub use listener::{
    ConnectionListener, ListenerSet, ProgressListener, Transcript, TranscriptListener,
};

use crate::config::ConnectionPreferences;
use crate::core::cache::DirectoryCache;
use crate::error::{Result, SessionError};
use crate::model::path::HOME;
use crate::model::url::encode_path;
use crate::model::{AttributedList, DescriptiveUrl, Host, Path, PathType, UrlType};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Opening,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Opening => write!(f, "opening"),
            State::Open => write!(f, "open"),
            State::Closing => write!(f, "closing"),
            State::Closed => write!(f, "closed"),
        }
    }
}

/// 远程存储会话
pub struct Session<B: Backend> {
    host: Host,
    /// 临时工作目录，mount 结束时总是被清空
    workdir_override: Mutex<Option<String>>,
    connection: Connection<B>,
    capabilities: Capabilities,
    features: FeatureRegistry,
    cache: DirectoryCache,
    state: Mutex<State>,
    preferences: ConnectionPreferences,
    connection_listeners: ListenerSet<dyn ConnectionListener>,
    progress_listeners: ListenerSet<dyn ProgressListener>,
    transcript: Transcript,
}

impl<B: Backend> Session<B> {
    pub fn new(host: Host, backend: B) -> Self {
        Self::with_preferences(host, backend, ConnectionPreferences::default())
    }

    pub fn with_preferences(host: Host, backend: B, preferences: ConnectionPreferences) -> Self {
        let backend = Arc::new(backend);
        let connection = Connection::new(backend.clone());
        let mut features = FeatureRegistry::new();
        backend.register_features(&mut features, &connection);
        let capabilities = backend.capabilities();
        let workdir_override = Mutex::new(host.workdir.clone());

        Self {
            host,
            workdir_override,
            connection,
            capabilities,
            features,
            cache: DirectoryCache::new(),
            state: Mutex::new(State::Closed),
            preferences,
            connection_listeners: ListenerSet::new(),
            progress_listeners: ListenerSet::new(),
            transcript: Transcript::new(),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn backend(&self) -> &Arc<B> {
        self.connection.backend()
    }

    pub fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: State) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// 当前连接句柄；未连接时为 `None`
    pub fn client(&self) -> Option<Arc<B::Client>> {
        self.connection.client().ok()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// 建立连接并登录
    ///
    /// 已连接时直接返回现有句柄。失败时状态回到 `Closed`，不持有句柄。
    pub async fn connect(&self) -> Result<Arc<B::Client>> {
        if let Some(client) = self.client() {
            return Ok(client);
        }
        self.fire_connection_will_open();

        let backend = self.connection.backend();
        let client = match backend.connect(&self.host, &self.transcript).await {
            Ok(client) => client,
            Err(e) => {
                warn!("连接 {} 失败: {}", self.host, e);
                self.set_state(State::Closed);
                return Err(e.into());
            }
        };
        if let Err(e) = backend.login(&client, &self.host, &self.transcript).await {
            warn!("登录 {} 失败: {}", self.host, e);
            if let Err(logout) = backend.logout(&client, &self.transcript).await {
                debug!("登录失败后断开连接出错: {}", logout);
            }
            self.set_state(State::Closed);
            return Err(e.into());
        }

        let client = Arc::new(client);
        self.connection.set(client.clone());
        self.fire_connection_did_open();
        Ok(client)
    }

    /// 断开连接，不会失败
    ///
    /// 登出错误只写入日志和会话记录；无论如何都会释放句柄、清空缓存并回到 `Closed`。
    pub async fn close(&self) {
        self.fire_connection_will_close();
        // 登出期间仍持有句柄，状态为 `Closing`
        if let Some(client) = self.client() {
            if let Err(e) = self
                .connection
                .backend()
                .logout(&client, &self.transcript)
                .await
            {
                warn!("断开 {} 时出错: {}", self.host, e);
                self.transcript.log(false, &format!("Logout failed: {}", e));
            }
        }
        self.connection.take();
        self.cache.clear();
        self.fire_connection_did_close();
    }

    /// 中断所有进行中的操作并强制关闭连接
    pub async fn interrupt(&self) {
        if let Some(client) = self.client() {
            self.connection.backend().interrupt(&client).await;
        }
        self.close().await;
    }

    pub async fn noop(&self) -> Result<()> {
        let client = self.connection.client()?;
        self.connection.backend().noop(&client).await
    }

    /// 设置下次 mount 使用的临时工作目录
    pub fn set_workdir(&self, workdir: Option<String>) {
        *self
            .workdir_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = workdir;
    }

    /// 挂载默认路径并列出到缓存
    ///
    /// 默认路径不存在或不可读时回退到工作目录。临时工作目录在任何情况下都会被重置。
    pub async fn mount(&self) -> Result<Path> {
        let workdir_override = &self.workdir_override;
        scopeguard::defer! {
            *workdir_override.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }

        let preferred = async {
            let home = self.home().await?;
            self.list(&home).await?;
            Ok::<_, SessionError>(home)
        }
        .await;

        match preferred {
            Ok(home) => {
                info!("已挂载 {}{}", self.host, home);
                Ok(home)
            }
            Err(e) => {
                warn!("挂载默认路径失败，回退到工作目录: {}", e);
                let workdir = self.workdir().await?;
                self.list(&workdir).await?;
                info!("已挂载 {}{}", self.host, workdir);
                Ok(workdir)
            }
        }
    }

    /// 主目录：临时工作目录 > 默认路径 > 服务端工作目录
    pub async fn home(&self) -> Result<Path> {
        let override_dir = self
            .workdir_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|d| !d.trim().is_empty());
        if let Some(dir) = override_dir {
            return Ok(Path::new(&dir, PathType::Directory));
        }

        let default_path = self
            .host
            .default_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        match default_path {
            Some(p) if p.starts_with('/') => Ok(Path::new(p, PathType::Directory)),
            Some(p) => {
                // `~/` 开头或普通相对路径都相对于工作目录
                let relative = p.strip_prefix(HOME).unwrap_or(p);
                Ok(self.workdir().await?.child(relative, PathType::Directory))
            }
            None => self.workdir().await,
        }
    }

    pub async fn workdir(&self) -> Result<Path> {
        let client = self.connection.client()?;
        self.connection.backend().workdir(&client).await
    }

    /// 实时列出目录并整体替换缓存中的列表
    pub async fn list(&self, directory: &Path) -> Result<AttributedList> {
        let list = self.connection.list(directory).await?;
        self.cache.put(directory, list.clone());
        Ok(list)
    }

    /// 会话唯一的目录缓存
    pub fn cache(&self) -> DirectoryCache {
        self.cache.clone()
    }

    /// 类型化的功能查询，例如 `session.feature::<dyn Find>()`
    pub fn feature<F>(&self) -> Option<Arc<F>>
    where
        F: ?Sized + Send + Sync + 'static,
    {
        self.features.get::<F>()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// 不支持时返回 `Unsupported`
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(SessionError::unsupported(capability.to_string()))
        }
    }

    pub fn is_create_folder_supported(&self) -> bool {
        self.capabilities.create_folder
    }

    pub fn is_create_file_supported(&self) -> bool {
        self.capabilities.create_file
    }

    pub fn is_rename_supported(&self) -> bool {
        self.capabilities.rename
    }

    pub fn is_acl_supported(&self) -> bool {
        self.capabilities.acl
    }

    pub fn is_unix_permissions_supported(&self) -> bool {
        self.capabilities.unix_permissions
    }

    pub fn is_read_timestamp_supported(&self) -> bool {
        self.capabilities.read_timestamp
    }

    pub fn is_write_timestamp_supported(&self) -> bool {
        self.capabilities.write_timestamp
    }

    pub fn is_checksum_supported(&self) -> bool {
        self.capabilities.checksum
    }

    pub fn is_revert_supported(&self) -> bool {
        self.capabilities.revert
    }

    pub fn is_send_command_supported(&self) -> bool {
        self.capabilities.send_command
    }

    pub fn is_archive_supported(&self) -> bool {
        self.capabilities.archive
    }

    pub fn is_unarchive_supported(&self) -> bool {
        self.capabilities.unarchive
    }

    pub fn is_download_resumable(&self) -> bool {
        self.capabilities.download_resumable
    }

    pub fn is_upload_resumable(&self) -> bool {
        self.capabilities.upload_resumable
    }

    pub fn is_create_symlink_supported(&self) -> bool {
        self.capabilities.create_symlink
    }

    pub fn is_metadata_supported(&self) -> bool {
        self.capabilities.metadata
    }

    /// 只有已连接且协议本身加密时为真
    pub fn is_secure(&self) -> bool {
        self.is_connected() && self.connection.backend().is_secure(&self.host)
    }

    pub async fn send_command(&self, command: &str) -> Result<()> {
        self.require(Capability::SendCommand)?;
        let client = self.connection.client()?;
        self.transcript.log(true, command);
        self.connection.backend().send_command(&client, command).await
    }

    /// 主机配置的编码，未配置时使用全局偏好
    pub fn encoding(&self) -> &str {
        self.host
            .encoding
            .as_deref()
            .unwrap_or(&self.preferences.encoding)
    }

    /// 最大并发连接数
    pub fn max_connections(&self) -> usize {
        self.host
            .max_connections
            .unwrap_or(self.preferences.max_connections)
            .max(1)
    }

    /// 以本会话协议表示的 URL
    pub fn to_url(&self, path: &Path, include_credentials: bool) -> String {
        format!(
            "{}{}",
            self.host.to_url(include_credentials),
            encode_path(path.absolute())
        )
    }

    /// 浏览器地址，路径相对于主机的绝对默认路径
    pub fn to_http_url(&self, path: &Path) -> String {
        let root = self
            .host
            .default_path
            .as_deref()
            .map(str::trim)
            .filter(|p| p.starts_with('/'))
            .map(|p| Path::new(p, PathType::Directory))
            .unwrap_or_else(Path::root);
        let relative = if !root.is_root() && path.is_child_of(&root) {
            &path.absolute()[root.absolute().len()..]
        } else {
            path.absolute()
        };
        let relative = if relative.is_empty() { "/" } else { relative };
        format!("{}{}", self.host.web_url(), encode_path(relative))
    }

    /// 协议 URL 在前，其后是所有浏览器地址
    pub fn urls(&self, path: &Path) -> Vec<DescriptiveUrl> {
        let native = DescriptiveUrl::new(
            self.to_url(path, true),
            UrlType::Native,
            format!("{} URL", self.host.protocol.scheme().to_uppercase()),
        );
        let mut urls = vec![native];
        for url in self.http_urls(path) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    /// 默认 Web 地址以及后端 [`UrlProvider`] 提供的地址，去重且保持顺序
    pub fn http_urls(&self, path: &Path) -> Vec<DescriptiveUrl> {
        let mut urls = vec![DescriptiveUrl::new(
            self.to_http_url(path),
            UrlType::Http,
            "HTTP URL",
        )];
        if let Some(provider) = self.feature::<dyn UrlProvider>() {
            for url in provider.to_url(path) {
                if !urls.iter().any(|u| u.url == url.url) {
                    urls.push(url);
                }
            }
        }
        urls
    }

    pub fn add_connection_listener(&self, listener: &Arc<dyn ConnectionListener>) {
        self.connection_listeners.add(listener);
    }

    pub fn remove_connection_listener(&self, listener: &Arc<dyn ConnectionListener>) {
        self.connection_listeners.remove(listener);
    }

    pub fn add_progress_listener(&self, listener: &Arc<dyn ProgressListener>) {
        self.progress_listeners.add(listener);
    }

    pub fn remove_progress_listener(&self, listener: &Arc<dyn ProgressListener>) {
        self.progress_listeners.remove(listener);
    }

    pub fn add_transcript_listener(&self, listener: &Arc<dyn TranscriptListener>) {
        self.transcript.add_listener(listener);
    }

    pub fn remove_transcript_listener(&self, listener: &Arc<dyn TranscriptListener>) {
        self.transcript.remove_listener(listener);
    }

    /// 通知所有进度监听器
    pub fn message(&self, message: &str) {
        info!("{}", message);
        for listener in self.progress_listeners.snapshot() {
            listener.message(message);
        }
    }

    /// 写入会话记录
    pub fn log(&self, request: bool, message: &str) {
        self.transcript.log(request, message);
    }

    fn fire_connection_will_open(&self) {
        debug!("即将连接 {}", self.host);
        self.set_state(State::Opening);
        for listener in self.connection_listeners.snapshot() {
            listener.connection_will_open();
        }
    }

    fn fire_connection_did_open(&self) {
        debug!("已连接 {}", self.host);
        self.set_state(State::Open);
        for listener in self.connection_listeners.snapshot() {
            listener.connection_did_open();
        }
    }

    fn fire_connection_will_close(&self) {
        debug!("即将断开 {}", self.host);
        self.set_state(State::Closing);
        for listener in self.connection_listeners.snapshot() {
            listener.connection_will_close();
        }
    }

    fn fire_connection_did_close(&self) {
        debug!("已断开 {}", self.host);
        self.set_state(State::Closed);
        for listener in self.connection_listeners.snapshot() {
            listener.connection_did_close();
        }
    }
}

/// 主机名与协议相同即视为同一会话
impl<B: Backend> PartialEq for Session<B> {
    fn eq(&self, other: &Self) -> bool {
        self.host.hostname == other.host.hostname && self.host.protocol == other.host.protocol
    }
}

impl<B: Backend> Eq for Session<B> {}

impl<B: Backend> Hash for Session<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hostname.hash(state);
        self.host.protocol.hash(state);
    }
}

impl<B: Backend> fmt::Display for Session<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session {}", self.host)
    }
}

impl<B: Backend> fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("state", &self.state())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
    use super::testing::MockBackend;
    use super::*;
    use crate::error::ConnectionError;
    use crate::model::{Credentials, Protocol};
    use std::sync::atomic::Ordering;
    use std::sync::OnceLock;

    /// 在每个事件里记录会话当时的状态和是否持有句柄
    #[derive(Default)]
    struct Events {
        session: OnceLock<Arc<Session<MockBackend>>>,
        seen: Mutex<Vec<(&'static str, State, bool)>>,
    }

    impl Events {
        fn record(&self, event: &'static str) {
            let session = self.session.get().unwrap();
            self.seen
                .lock()
                .unwrap()
                .push((event, session.state(), session.is_connected()));
        }
    }

    impl ConnectionListener for Events {
        fn connection_will_open(&self) {
            self.record("will_open");
        }
        fn connection_did_open(&self) {
            self.record("did_open");
        }
        fn connection_will_close(&self) {
            self.record("will_close");
        }
        fn connection_did_close(&self) {
            self.record("did_close");
        }
    }

    impl TranscriptListener for Events {
        fn log(&self, _request: bool, message: &str) {
            if message == "QUIT" {
                self.record("logout");
            }
        }
    }

    struct Messages(Mutex<Vec<String>>);

    impl ProgressListener for Messages {
        fn message(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn host() -> Host {
        Host::new(Protocol::Sftp, "files.example.net")
            .with_credentials(Credentials::new("alice", "secret"))
    }

    fn session() -> Session<MockBackend> {
        let backend = MockBackend::new();
        backend
            .add(Path::new("/home", PathType::Directory))
            .add(Path::new("/home/alice", PathType::Directory))
            .add_file("/home/alice/a.txt", 3, 1_000);
        Session::new(host(), backend)
    }

    #[tokio::test]
    async fn test_connect_and_close_fire_events_in_order() {
        let session = Arc::new(session());
        let events = Arc::new(Events::default());
        events.session.set(session.clone()).ok();
        let listener: Arc<dyn ConnectionListener> = events.clone();
        session.add_connection_listener(&listener);
        let transcript: Arc<dyn TranscriptListener> = events.clone();
        session.add_transcript_listener(&transcript);
        assert_eq!(session.state(), State::Closed);

        session.connect().await.unwrap();
        assert_eq!(session.state(), State::Open);
        assert!(session.is_connected());

        // 已连接时再次 connect 不会产生事件
        session.connect().await.unwrap();

        session.close().await;
        assert_eq!(session.state(), State::Closed);
        assert!(!session.is_connected());
        assert_eq!(
            *events.seen.lock().unwrap(),
            vec![
                ("will_open", State::Opening, false),
                ("did_open", State::Open, true),
                ("will_close", State::Closing, true),
                ("logout", State::Closing, true),
                ("did_close", State::Closed, false),
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_session_closed() {
        let session = session();
        session.backend().fail_connect.store(true, Ordering::SeqCst);
        let err = session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Connection(ConnectionError::Network(_))
        ));
        assert_eq!(session.state(), State::Closed);
        assert!(session.client().is_none());
    }

    #[tokio::test]
    async fn test_login_failure_logs_out() {
        let session = session();
        session.backend().fail_login.store(true, Ordering::SeqCst);
        session.backend().fail_logout.store(true, Ordering::SeqCst);
        let err = session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Connection(ConnectionError::Login(_))
        ));
        assert_eq!(session.backend().logout_calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_close_swallows_logout_errors_and_clears_cache() {
        struct Lines(Mutex<Vec<String>>);
        impl TranscriptListener for Lines {
            fn log(&self, _request: bool, message: &str) {
                self.0.lock().unwrap().push(message.to_string());
            }
        }

        let session = session();
        let lines = Arc::new(Lines(Mutex::new(Vec::new())));
        let listener: Arc<dyn TranscriptListener> = lines.clone();
        session.add_transcript_listener(&listener);
        session.connect().await.unwrap();
        session.list(&Path::new("/home", PathType::Directory)).await.unwrap();
        assert!(!session.cache().is_empty());

        session.backend().fail_logout.store(true, Ordering::SeqCst);
        session.close().await;

        assert_eq!(session.state(), State::Closed);
        assert!(session.cache().is_empty());
        assert!(lines
            .0
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.contains("broken pipe")));
    }

    #[tokio::test]
    async fn test_mount_default_path() {
        let session = Session::new(
            host().with_default_path("~/alice"),
            {
                let backend = MockBackend::new();
                *backend.workdir.lock().unwrap() = "/home".to_string();
                backend
                    .add(Path::new("/home", PathType::Directory))
                    .add(Path::new("/home/alice", PathType::Directory));
                backend
            },
        );
        session.connect().await.unwrap();
        let mounted = session.mount().await.unwrap();
        assert_eq!(mounted.absolute(), "/home/alice");
        assert!(session.cache().is_cached(&mounted));
    }

    #[tokio::test]
    async fn test_mount_falls_back_to_workdir_and_resets_override() {
        let session = session();
        session.connect().await.unwrap();
        session.set_workdir(Some("/does/not/exist".to_string()));

        let mounted = session.mount().await.unwrap();
        assert_eq!(mounted.absolute(), "/");

        // 临时工作目录已被重置
        assert_eq!(session.home().await.unwrap().absolute(), "/");
    }

    #[tokio::test]
    async fn test_mount_uses_workdir_override_once() {
        let session = session();
        session.connect().await.unwrap();
        session.set_workdir(Some("/home/alice".to_string()));
        assert_eq!(session.mount().await.unwrap().absolute(), "/home/alice");
        assert_eq!(session.mount().await.unwrap().absolute(), "/");
    }

    #[tokio::test]
    async fn test_list_requires_connection() {
        let session = session();
        let err = session.list(&Path::root()).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Connection(ConnectionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_feature_after_close_reports_closed() {
        let session = session();
        let find = session.feature::<dyn Find>().unwrap();
        session.connect().await.unwrap();
        assert!(find
            .find(&Path::new("/home/alice/a.txt", PathType::File))
            .await
            .unwrap());

        session.close().await;
        let err = find
            .find(&Path::new("/home/alice/a.txt", PathType::File))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Connection(ConnectionError::Closed)
        ));
        assert!(session.feature::<dyn Delete>().is_none());
    }

    #[tokio::test]
    async fn test_send_command_unsupported() {
        let session = session();
        session.connect().await.unwrap();
        assert!(!session.is_send_command_supported());
        let err = session.send_command("SITE CHMOD 644 a").await.unwrap_err();
        assert!(matches!(err, SessionError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_is_secure_requires_connection() {
        let session = session();
        assert!(!session.is_secure());
        session.connect().await.unwrap();
        assert!(session.is_secure());
    }

    #[test]
    fn test_capability_defaults() {
        let session = session();
        assert!(session.is_create_folder_supported());
        assert!(session.is_rename_supported());
        assert!(!session.is_acl_supported());
        assert!(!session.is_checksum_supported());
        assert!(session.is_download_resumable());
        assert!(session.require(Capability::Rename).is_ok());
        assert!(session.require(Capability::Archive).is_err());
    }

    #[test]
    fn test_equality_by_hostname_and_protocol() {
        let a = Session::new(host(), MockBackend::new());
        let b = Session::new(
            host().with_credentials(Credentials::new("bob", "other")),
            MockBackend::new(),
        );
        let c = Session::new(
            Host::new(Protocol::Ftp, "files.example.net"),
            MockBackend::new(),
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "Session sftp://files.example.net");
    }

    #[test]
    fn test_progress_messages() {
        let session = session();
        let messages = Arc::new(Messages(Mutex::new(Vec::new())));
        let listener: Arc<dyn ProgressListener> = messages.clone();
        session.add_progress_listener(&listener);
        session.message("Listing /home");
        session.remove_progress_listener(&listener);
        session.message("ignored");
        assert_eq!(*messages.0.lock().unwrap(), vec!["Listing /home"]);
    }

    #[test]
    fn test_to_url_encodes_segments() {
        let session = session();
        let path = Path::new("/home/alice/my file.txt", PathType::File);
        assert_eq!(
            session.to_url(&path, true),
            "sftp://alice@files.example.net/home/alice/my%20file.txt"
        );
        assert_eq!(session.to_url(&Path::root(), false), "sftp://files.example.net/");
    }

    #[test]
    fn test_http_url_relative_to_default_path() {
        let session = Session::new(
            host()
                .with_default_path("/var/www")
                .with_web_url("https://www.example.net/"),
            MockBackend::new(),
        );
        assert_eq!(
            session.to_http_url(&Path::new("/var/www/img/a b.png", PathType::File)),
            "https://www.example.net/img/a%20b.png"
        );
        assert_eq!(
            session.to_http_url(&Path::new("/var/www", PathType::Directory)),
            "https://www.example.net/"
        );
        assert_eq!(
            session.to_http_url(&Path::new("/etc/hosts", PathType::File)),
            "https://www.example.net/etc/hosts"
        );
    }

    #[test]
    fn test_urls_lists_native_then_http() {
        let session = session();
        let file = Path::new("/home/alice/a.txt", PathType::File);
        let urls = session.urls(&file);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].kind, UrlType::Native);
        assert_eq!(urls[0].url, "sftp://alice@files.example.net/home/alice/a.txt");
        assert_eq!(urls[0].help, "SFTP URL");
        assert_eq!(urls[1].kind, UrlType::Http);
        assert_eq!(urls[1].url, "http://files.example.net/home/alice/a.txt");
        assert_eq!(session.http_urls(&file), urls[1..].to_vec());
    }

    #[test]
    fn test_encoding_and_connection_limits() {
        let mut host = host();
        let session = Session::new(host.clone(), MockBackend::new());
        assert_eq!(session.encoding(), "UTF-8");
        assert_eq!(session.max_connections(), 1);

        host.encoding = Some("ISO-8859-1".to_string());
        host.max_connections = Some(4);
        let session = Session::new(host, MockBackend::new());
        assert_eq!(session.encoding(), "ISO-8859-1");
        assert_eq!(session.max_connections(), 4);
    }
}
