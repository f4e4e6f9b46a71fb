use serde::{Deserialize, Serialize};
use std::fmt;

/// 可选操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateFolder,
    CreateFile,
    Rename,
    Acl,
    UnixPermissions,
    ReadTimestamp,
    WriteTimestamp,
    Checksum,
    Revert,
    SendCommand,
    Archive,
    Unarchive,
    DownloadResumable,
    UploadResumable,
    CreateSymlink,
    Metadata,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 后端声明的能力，默认值对大多数文件协议成立
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub create_folder: bool,
    pub create_file: bool,
    pub rename: bool,
    pub acl: bool,
    pub unix_permissions: bool,
    pub read_timestamp: bool,
    pub write_timestamp: bool,
    /// MD5/ETag 等校验和
    pub checksum: bool,
    pub revert: bool,
    pub send_command: bool,
    pub archive: bool,
    pub unarchive: bool,
    pub download_resumable: bool,
    pub upload_resumable: bool,
    pub create_symlink: bool,
    pub metadata: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            create_folder: true,
            create_file: true,
            rename: true,
            acl: false,
            unix_permissions: true,
            read_timestamp: true,
            write_timestamp: true,
            checksum: false,
            revert: false,
            send_command: false,
            archive: false,
            unarchive: false,
            download_resumable: true,
            upload_resumable: true,
            create_symlink: false,
            metadata: false,
        }
    }
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::CreateFolder => self.create_folder,
            Capability::CreateFile => self.create_file,
            Capability::Rename => self.rename,
            Capability::Acl => self.acl,
            Capability::UnixPermissions => self.unix_permissions,
            Capability::ReadTimestamp => self.read_timestamp,
            Capability::WriteTimestamp => self.write_timestamp,
            Capability::Checksum => self.checksum,
            Capability::Revert => self.revert,
            Capability::SendCommand => self.send_command,
            Capability::Archive => self.archive,
            Capability::Unarchive => self.unarchive,
            Capability::DownloadResumable => self.download_resumable,
            Capability::UploadResumable => self.upload_resumable,
            Capability::CreateSymlink => self.create_symlink,
            Capability::Metadata => self.metadata,
        }
    }
}
