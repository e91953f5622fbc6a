//! Catalog models.
//!
//! These types describe what a catalog enumerates (volumes) and what a search
//! returns (folders of found files), plus the read-only search configuration
//! shared by every concurrent search.

use crate::pattern::Pattern;
use crate::path::DatastorePath;
use derive_more::Display;
use std::path::Path;
use time::OffsetDateTime;

/// One storage volume (datastore) as enumerated by a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    /// Whether the volume can currently be browsed.
    pub accessible: bool,
    /// The volume is being decommissioned and must not be searched.
    pub pending_deletion: bool,
}
impl Volume {
    /// An accessible volume.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accessible: true,
            pending_deletion: false,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.accessible = false;
        self
    }

    pub fn pending_deletion(mut self) -> Self {
        self.pending_deletion = true;
        self
    }

    /// Why this volume must be skipped, if it must.
    ///
    /// Pending deletion takes precedence when both flags apply.
    pub fn exclusion(&self) -> Option<Exclusion> {
        match (self.pending_deletion, self.accessible) {
            (true, _) => Some(Exclusion::PendingDeletion),
            (false, false) => Some(Exclusion::Unavailable),
            (false, true) => None,
        }
    }
}

/// Reason a volume is left out of a search.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exclusion {
    #[display("pending deletion")]
    PendingDeletion,
    #[display("unavailable")]
    Unavailable,
}

/// Metadata to retrieve for every found file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDetails {
    pub size: bool,
    pub modified: bool,
    pub owner: bool,
    pub file_type: bool,
}
impl Default for FileDetails {
    fn default() -> Self {
        Self {
            size: true,
            modified: true,
            owner: false,
            file_type: false,
        }
    }
}

/// What to search for. Built once, shared read-only by every search.
#[derive(Debug, Clone)]
pub struct SearchSpec {
    pub pattern: Pattern,
    pub details: FileDetails,
    /// Descend into sub-folders of the search root.
    pub recursive: bool,
}
impl SearchSpec {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            details: FileDetails::default(),
            recursive: true,
        }
    }

    pub fn with_details(mut self, details: FileDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// All matches found directly inside one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub folder: DatastorePath,
    pub files: Vec<FoundFile>,
}

/// One matching file, relative to the folder of its [`SearchResult`].
///
/// Optional fields are only populated when requested via [`FileDetails`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    pub path: String,
    pub size: Option<u64>,
    pub modified: Option<OffsetDateTime>,
    pub owner: Option<String>,
    pub kind: Option<FileKind>,
}
impl FoundFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: None,
            modified: None,
            owner: None,
            kind: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Coarse classification of datastore files, detected from the extension.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FileKind {
    #[default]
    #[display("file")]
    File,
    #[display("virtual disk")]
    VirtualDisk,
    #[display("vm config")]
    VmConfig,
    #[display("vm log")]
    VmLog,
    #[display("vm nvram")]
    VmNvram,
    #[display("vm snapshot")]
    VmSnapshot,
    #[display("iso image")]
    IsoImage,
    #[display("floppy image")]
    FloppyImage,
}
impl FileKind {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return Self::File;
        };
        match ext.to_ascii_lowercase().as_str() {
            "vmdk" => Self::VirtualDisk,
            "vmx" => Self::VmConfig,
            "log" => Self::VmLog,
            "nvram" => Self::VmNvram,
            "vmsn" | "vmsd" => Self::VmSnapshot,
            "iso" => Self::IsoImage,
            "flp" => Self::FloppyImage,
            _ => Self::File,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_exclusion() {
        assert_eq!(Volume::new("a").exclusion(), None);
        assert_eq!(Volume::new("a").unavailable().exclusion(), Some(Exclusion::Unavailable));
        assert_eq!(Volume::new("a").pending_deletion().exclusion(), Some(Exclusion::PendingDeletion));
        assert_eq!(
            Volume::new("a").unavailable().pending_deletion().exclusion(),
            Some(Exclusion::PendingDeletion)
        );
    }

    #[rstest]
    #[case("vms/web/web.vmdk", FileKind::VirtualDisk)]
    #[case("web-flat.VMDK", FileKind::VirtualDisk)]
    #[case("web.vmx", FileKind::VmConfig)]
    #[case("vmware-1.log", FileKind::VmLog)]
    #[case("web-Snapshot1.vmsn", FileKind::VmSnapshot)]
    #[case("isos/debian.iso", FileKind::IsoImage)]
    #[case("README", FileKind::File)]
    #[case("notes.txt", FileKind::File)]
    fn test_file_kind(#[case] path: &str, #[case] expected: FileKind) {
        assert_eq!(FileKind::from_path(path), expected);
    }

    #[test]
    fn test_default_details() {
        let details = FileDetails::default();
        assert!(details.size && details.modified);
        assert!(!details.owner && !details.file_type);
    }
}
