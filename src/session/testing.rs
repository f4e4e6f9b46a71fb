//! 测试用的内存后端

use super::backend::Backend;
use super::capabilities::Capabilities;
use super::listener::Transcript;
use crate::error::{ConnectionError, Result, SessionError};
use crate::model::{AttributedList, Host, Path, PathType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
pub(crate) struct MockClient;

#[derive(Default)]
pub(crate) struct MockBackend {
    directories: Mutex<HashMap<String, Vec<Path>>>,
    pub workdir: Mutex<String>,
    pub fail_connect: AtomicBool,
    pub fail_login: AtomicBool,
    pub fail_logout: AtomicBool,
    pub logout_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub capabilities: Capabilities,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.workdir.lock().unwrap() = "/".to_string();
        backend
    }

    /// 添加文件或目录，父目录的列表随之建立
    pub fn add(&self, path: Path) -> &Self {
        let mut directories = self.directories.lock().unwrap();
        if path.is_directory() {
            directories.entry(path.absolute().to_string()).or_default();
        }
        if let Some(parent) = path.parent() {
            let children = directories.entry(parent.absolute().to_string()).or_default();
            children.retain(|c| c != &path);
            children.push(path);
        }
        self
    }

    pub fn add_file(&self, absolute: &str, size: u64, modified_millis: i64) -> &Self {
        let mut file = Path::new(absolute, PathType::File);
        file.attributes_mut().size = Some(size);
        file.attributes_mut().modification_date = Some(modified_millis);
        self.add(file)
    }
}

#[async_trait]
impl Backend for MockBackend {
    type Client = MockClient;

    async fn connect(
        &self,
        host: &Host,
        transcript: &Transcript,
    ) -> std::result::Result<MockClient, ConnectionError> {
        transcript.log(true, &format!("CONNECT {}", host.hostname));
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ConnectionError::Network("connection refused".to_string()));
        }
        Ok(MockClient)
    }

    async fn login(
        &self,
        _client: &MockClient,
        host: &Host,
        _transcript: &Transcript,
    ) -> std::result::Result<(), ConnectionError> {
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(ConnectionError::Login(host.credentials.username.clone()));
        }
        Ok(())
    }

    async fn logout(&self, _client: &MockClient, transcript: &Transcript) -> Result<()> {
        transcript.log(true, "QUIT");
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("broken pipe").into());
        }
        Ok(())
    }

    async fn list(&self, _client: &MockClient, directory: &Path) -> Result<AttributedList> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.directories
            .lock()
            .unwrap()
            .get(directory.absolute())
            .map(|children| AttributedList::new(children.clone()))
            .ok_or_else(|| SessionError::not_found(directory.absolute()))
    }

    async fn workdir(&self, _client: &MockClient) -> Result<Path> {
        Ok(Path::new(&self.workdir.lock().unwrap(), PathType::Directory))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
