pub mod host;
pub mod item;
pub mod local;
pub mod path;
pub mod url;

pub use host::{Credentials, Host, Protocol};
pub use item::TransferItem;
pub use local::{FileSystemLocal, Local, LocalAttributes};
pub use path::{AttributedList, Checksum, HashAlgorithm, Path, PathAttributes, PathType};
pub use url::{DescriptiveUrl, UrlType};
