//! Directory entry type tags.

use std::fs::FileType;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Type of a file system node as reported by the directory read or `lstat`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Type could not be determined.
    #[default]
    Unknown,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }

    /// Check if this is a regular file.
    pub fn is_regular(self) -> bool {
        self == EntryKind::Regular
    }

    /// Check if this is a symlink.
    pub fn is_symlink(self) -> bool {
        self == EntryKind::Symlink
    }

    /// Character used in the first column of `ls -l` style permissions.
    pub fn mode_char(self) -> char {
        match self {
            EntryKind::Regular | EntryKind::Unknown => '-',
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::CharDevice => 'c',
            EntryKind::BlockDevice => 'b',
            EntryKind::Fifo => 'p',
            EntryKind::Socket => 's',
        }
    }
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_dir() {
            return EntryKind::Directory;
        }
        if file_type.is_file() {
            return EntryKind::Regular;
        }
        if file_type.is_symlink() {
            return EntryKind::Symlink;
        }
        special_kind(file_type)
    }
}

#[cfg(unix)]
fn special_kind(file_type: FileType) -> EntryKind {
    use std::os::unix::fs::FileTypeExt;

    if file_type.is_char_device() {
        EntryKind::CharDevice
    } else if file_type.is_block_device() {
        EntryKind::BlockDevice
    } else if file_type.is_fifo() {
        EntryKind::Fifo
    } else if file_type.is_socket() {
        EntryKind::Socket
    } else {
        EntryKind::Unknown
    }
}

#[cfg(not(unix))]
fn special_kind(_file_type: FileType) -> EntryKind {
    EntryKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_is_kebab_case() {
        assert_eq!(EntryKind::CharDevice.to_string(), "char-device");
        assert_eq!(EntryKind::Regular.to_string(), "regular");
        assert_eq!(EntryKind::from_str("block-device").unwrap(), EntryKind::BlockDevice);
    }

    #[test]
    fn test_from_file_type() {
        let dir = std::env::temp_dir();
        let meta = std::fs::symlink_metadata(&dir).unwrap();
        assert_eq!(EntryKind::from(meta.file_type()), EntryKind::Directory);
    }

    #[test]
    fn test_mode_char() {
        assert_eq!(EntryKind::Directory.mode_char(), 'd');
        assert_eq!(EntryKind::Symlink.mode_char(), 'l');
        assert_eq!(EntryKind::Regular.mode_char(), '-');
    }
}
