//! 远程路径与属性快照

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DELIMITER: char = '/';
pub const HOME: &str = "~";

/// 文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    #[default]
    File,
    Directory,
    Symlink,
}

/// 校验和算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// 本地是否能计算该算法
    pub fn is_computable(&self) -> bool {
        matches!(
            self,
            HashAlgorithm::Md5 | HashAlgorithm::Sha256 | HashAlgorithm::Blake3
        )
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Md5 => write!(f, "md5"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

/// 校验和；`hash` 为空表示后端不提供
///
/// `algorithm` 为 `None` 时是不透明的值（例如 ETag），无法在本地复算。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: Option<HashAlgorithm>,
    pub hash: String,
}

impl Checksum {
    pub const NONE: Checksum = Checksum {
        algorithm: None,
        hash: String::new(),
    };

    pub fn new(algorithm: HashAlgorithm, hash: impl Into<String>) -> Self {
        Self {
            algorithm: Some(algorithm),
            hash: hash.into(),
        }
    }

    pub fn opaque(hash: impl Into<String>) -> Self {
        Self {
            algorithm: None,
            hash: hash.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hash.trim().is_empty()
    }

    /// 两边都有值、算法一致且十六进制串相同（忽略大小写）
    pub fn matches(&self, other: &Checksum) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if let (Some(a), Some(b)) = (self.algorithm, other.algorithm) {
            if a != b {
                return false;
            }
        }
        self.hash.trim().eq_ignore_ascii_case(other.hash.trim())
    }
}

/// 远程文件元数据快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathAttributes {
    pub kind: PathType,
    /// 字节数，`None` 表示未知
    pub size: Option<u64>,
    /// 修改时间（毫秒时间戳），`None` 表示未知
    pub modification_date: Option<i64>,
    #[serde(default)]
    pub checksum: Checksum,
    /// 后端内部的文件 id / 版本 id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl PathAttributes {
    pub fn new(kind: PathType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == PathType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == PathType::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == PathType::Symlink
    }
}

/// 规范化为以 `/` 开头、无尾部分隔符的绝对路径
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("{}{}", DELIMITER, parts.join("/"))
}

/// 远程路径
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    absolute: String,
    attributes: PathAttributes,
}

impl Path {
    pub fn new(absolute: &str, kind: PathType) -> Self {
        Self {
            absolute: normalize(absolute),
            attributes: PathAttributes::new(kind),
        }
    }

    pub fn root() -> Self {
        Self::new("/", PathType::Directory)
    }

    pub fn with_attributes(absolute: &str, attributes: PathAttributes) -> Self {
        Self {
            absolute: normalize(absolute),
            attributes,
        }
    }

    pub fn child(&self, name: &str, kind: PathType) -> Self {
        Self::new(&format!("{}/{}", self.absolute, name), kind)
    }

    pub fn absolute(&self) -> &str {
        &self.absolute
    }

    pub fn name(&self) -> &str {
        self.absolute
            .rsplit(DELIMITER)
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("/")
    }

    pub fn is_root(&self) -> bool {
        self.absolute == "/"
    }

    /// 父目录；根目录没有父目录
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        let parent = match self.absolute.rfind(DELIMITER) {
            Some(0) | None => "/",
            Some(idx) => &self.absolute[..idx],
        };
        Some(Path::new(parent, PathType::Directory))
    }

    pub fn kind(&self) -> PathType {
        self.attributes.kind
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.is_directory()
    }

    pub fn is_file(&self) -> bool {
        self.attributes.is_file()
    }

    pub fn attributes(&self) -> &PathAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut PathAttributes {
        &mut self.attributes
    }

    /// 是否位于 `dir` 之下（含自身）
    pub fn is_child_of(&self, dir: &Path) -> bool {
        dir.is_root()
            || self.absolute == dir.absolute
            || self.absolute.starts_with(&format!("{}/", dir.absolute))
    }
}

// 路径身份只由绝对路径决定，属性不参与比较
impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
    }
}

impl Eq for Path {}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.absolute)
    }
}

/// 目录列表，保持后端返回的顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributedList {
    children: Vec<Path>,
}

impl AttributedList {
    pub fn new(children: Vec<Path>) -> Self {
        Self { children }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, file: &Path) -> Option<&Path> {
        self.children.iter().find(|p| p.absolute == file.absolute)
    }

    pub fn contains(&self, file: &Path) -> bool {
        self.get(file).is_some()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.children.iter()
    }
}

impl FromIterator<Path> for AttributedList {
    fn from_iter<I: IntoIterator<Item = Path>>(iter: I) -> Self {
        Self {
            children: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AttributedList {
    type Item = Path;
    type IntoIter = std::vec::IntoIter<Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.into_iter()
    }
}
