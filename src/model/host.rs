use serde::{Deserialize, Serialize};
use std::fmt;

/// 协议类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Local,
    Memory,
    S3,
    WebDav,
    Ftp,
    Sftp,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Local => "file",
            Protocol::Memory => "memory",
            Protocol::S3 => "s3",
            Protocol::WebDav => "dav",
            Protocol::Ftp => "ftp",
            Protocol::Sftp => "sftp",
        }
    }

    /// 控制通道是否经过 TLS/SSH 加密
    pub fn is_secure(&self) -> bool {
        matches!(self, Protocol::S3 | Protocol::Sftp)
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Protocol::S3 => Some(443),
            Protocol::WebDav => Some(80),
            Protocol::Ftp => Some(21),
            Protocol::Sftp => Some(22),
            Protocol::Local | Protocol::Memory => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// 登录凭证
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}

// 不在日志里输出密码
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// 连接目标
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub protocol: Protocol,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub credentials: Credentials,
    /// 挂载时使用的默认路径，绝对路径、`~/` 开头或相对工作目录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    /// 临时工作目录，每次 mount 后被重置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,
    /// 通过浏览器访问的地址，未配置时为 `http://hostname`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

impl Host {
    pub fn new(protocol: Protocol, hostname: impl Into<String>) -> Self {
        Self {
            protocol,
            hostname: hostname.into(),
            port: None,
            credentials: Credentials::default(),
            default_path: None,
            workdir: None,
            encoding: None,
            max_connections: None,
            web_url: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_default_path(mut self, path: impl Into<String>) -> Self {
        self.default_path = Some(path.into());
        self
    }

    pub fn with_workdir(mut self, path: impl Into<String>) -> Self {
        self.workdir = Some(path.into());
        self
    }

    pub fn with_web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = Some(url.into());
        self
    }

    /// 不带尾部 `/` 的 Web 地址
    pub fn web_url(&self) -> String {
        match self.web_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.hostname),
        }
    }

    /// `scheme://[user@]hostname[:port]`，端口与协议默认端口相同时省略
    pub fn to_url(&self, include_credentials: bool) -> String {
        let mut url = format!("{}://", self.protocol.scheme());
        if include_credentials && !self.credentials.is_anonymous() {
            url.push_str(&urlencoding::encode(&self.credentials.username));
            url.push('@');
        }
        url.push_str(&self.hostname);
        if let Some(port) = self.port {
            if Some(port) != self.protocol.default_port() {
                url.push_str(&format!(":{}", port));
            }
        }
        url
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_url(false))
    }
}
