use serde::{Deserialize, Serialize};
use std::fmt;

/// URL 的用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    /// 会话自身协议的 URL
    Native,
    /// 可在浏览器中打开的 URL
    Http,
}

/// 带说明的 URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptiveUrl {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: UrlType,
    /// 例如 `HTTP URL`
    pub help: String,
}

impl DescriptiveUrl {
    pub fn new(url: impl Into<String>, kind: UrlType, help: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            help: help.into(),
        }
    }
}

impl fmt::Display for DescriptiveUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// 按 `/` 分段编码路径
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
