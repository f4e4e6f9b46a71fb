//! 协议后端接口

use super::capabilities::Capabilities;
use super::features::{register_listing_features, FeatureRegistry, ListService};
use super::listener::Transcript;
use crate::error::{ConnectionError, Result, SessionError};
use crate::model::{AttributedList, Host, Path};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// 具体协议的实现
///
/// `Client` 是后端连接句柄，会话只在连接建立后持有它。
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    type Client: Send + Sync + 'static;

    /// 建立连接
    async fn connect(
        &self,
        host: &Host,
        transcript: &Transcript,
    ) -> std::result::Result<Self::Client, ConnectionError>;

    /// 发送登录凭证，连接必须已建立
    async fn login(
        &self,
        client: &Self::Client,
        host: &Host,
        transcript: &Transcript,
    ) -> std::result::Result<(), ConnectionError>;

    /// 断开连接；错误只会被记录
    async fn logout(&self, client: &Self::Client, transcript: &Transcript) -> Result<()>;

    /// 强制中断正在进行的操作
    async fn interrupt(&self, _client: &Self::Client) {}

    async fn list(&self, client: &Self::Client, directory: &Path) -> Result<AttributedList>;

    /// 服务端返回的当前工作目录
    async fn workdir(&self, _client: &Self::Client) -> Result<Path> {
        Ok(Path::root())
    }

    async fn noop(&self, _client: &Self::Client) -> Result<()> {
        Ok(())
    }

    async fn send_command(&self, _client: &Self::Client, command: &str) -> Result<()> {
        Err(SessionError::unsupported(format!("send command {}", command)))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn is_secure(&self, host: &Host) -> bool {
        host.protocol.is_secure()
    }

    /// 会话创建时调用一次；默认注册基于列表的 Find/Attributes/IdProvider
    fn register_features(&self, features: &mut FeatureRegistry, connection: &Connection<Self>)
    where
        Self: Sized,
    {
        register_listing_features(features, Arc::new(connection.clone()));
    }
}

/// 会话与功能对象共享的连接句柄
pub struct Connection<B: Backend> {
    backend: Arc<B>,
    client: Arc<RwLock<Option<Arc<B::Client>>>>,
}

impl<B: Backend> Clone for Connection<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            client: self.client.clone(),
        }
    }
}

impl<B: Backend> Connection<B> {
    pub(crate) fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            client: Arc::new(RwLock::new(None)),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// 当前连接句柄；未连接或已关闭时返回 `ConnectionError::Closed`
    pub fn client(&self) -> Result<Arc<B::Client>> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ConnectionError::Closed.into())
    }

    pub fn is_connected(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn set(&self, client: Arc<B::Client>) {
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Some(client);
    }

    pub(crate) fn take(&self) -> Option<Arc<B::Client>> {
        self.client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl<B: Backend> ListService for Connection<B> {
    async fn list(&self, directory: &Path) -> Result<AttributedList> {
        let client = self.client()?;
        self.backend.list(&client, directory).await
    }
}
