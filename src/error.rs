//! 错误类型

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// 连接/登录阶段的错误
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Login failed: {0}")]
    Login(String),
    #[error("Network failure: {0}")]
    Network(String),
    #[error("Protocol negotiation failed: {0}")]
    Protocol(String),
    /// 连接已关闭（未连接或已被 interrupt）
    #[error("Connection closed")]
    Closed,
}

/// 会话与功能层的统一错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Background(#[from] anyhow::Error),
}

impl SessionError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported(operation.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
