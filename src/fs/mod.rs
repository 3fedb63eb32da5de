//! On-disk structure readers: filesystem identification, FAT root-directory
//! walking, simplified NTFS MFT scanning.
//!
//! These readers accept truncated or garbage input by design: a read that
//! would run past the buffer ends that parse and whatever was recovered so
//! far is returned.

pub mod fat;
pub mod ntfs;

pub use fat::parse_fat_directory;
pub use ntfs::parse_ntfs_mft;

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilesystemKind {
    Fat16,
    Fat32,
    Ntfs,
    Ext4,
    Unknown,
}

impl FilesystemKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilesystemKind::Fat16 => "FAT16",
            FilesystemKind::Fat32 => "FAT32",
            FilesystemKind::Ntfs => "NTFS",
            FilesystemKind::Ext4 => "ext4",
            FilesystemKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

const NTFS_OEM_OFFSET: usize = 3;
const FAT16_LABEL_OFFSET: usize = 54;
const FAT32_LABEL_OFFSET: usize = 82;
const EXT_MAGIC_OFFSET: usize = 1080;

/// Identifies the filesystem from signature bytes at fixed boot-sector
/// offsets. Unrecognized or short input is `Unknown`, never an error.
pub fn identify_filesystem(buffer: &[u8]) -> FilesystemKind {
    if region_matches(buffer, NTFS_OEM_OFFSET, b"NTFS") {
        FilesystemKind::Ntfs
    } else if region_matches(buffer, FAT16_LABEL_OFFSET, b"FAT16") {
        FilesystemKind::Fat16
    } else if region_matches(buffer, FAT32_LABEL_OFFSET, b"FAT32") {
        FilesystemKind::Fat32
    } else if region_matches(buffer, EXT_MAGIC_OFFSET, &[0x53, 0xEF]) {
        FilesystemKind::Ext4
    } else {
        FilesystemKind::Unknown
    }
}

fn region_matches(buffer: &[u8], offset: usize, pattern: &[u8]) -> bool {
    offset
        .checked_add(pattern.len())
        .and_then(|end| buffer.get(offset..end))
        .is_some_and(|region| region == pattern)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileAttribute {
    ReadOnly,
    Hidden,
    System,
    Directory,
    Archive,
}

/// One recovered directory record, from either a FAT root directory or an
/// NTFS MFT record. The NTFS reader stores the MFT record number in
/// `start_cluster`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub size_bytes: u64,
    pub is_directory: bool,
    pub is_deleted: bool,
    pub start_cluster: u32,
    pub attributes: Vec<FileAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub active: Vec<DirectoryEntry>,
    pub deleted: Vec<DirectoryEntry>,
}

impl DirectoryListing {
    pub fn push(&mut self, entry: DirectoryEntry) {
        if entry.is_deleted {
            self.deleted.push(entry);
        } else {
            self.active.push(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.deleted.is_empty()
    }
}
