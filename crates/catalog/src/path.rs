//! Datastore path addressing.
//!
//! Objects inside a volume are addressed as `"[volume] folder/file"`. The
//! bracketed part names the volume; the remainder is a relative path that
//! must never leave the volume root.

use crate::error::{Error, ErrorKind, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// A location inside a named volume.
///
/// # Examples
///
/// ```
/// use dsfind_catalog::DatastorePath;
///
/// let path: DatastorePath = "[ds-01] vms/web/web.vmdk".parse().unwrap();
/// assert_eq!(path.volume(), "ds-01");
/// assert_eq!(path.to_string(), "[ds-01] vms/web/web.vmdk");
///
/// let root = DatastorePath::root("ds-01");
/// assert_eq!(root.to_string(), "[ds-01]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatastorePath {
    volume: String,
    path: PathBuf,
}

impl DatastorePath {
    /// Build a path inside `volume`. An empty `path` addresses the volume root.
    pub fn new(volume: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let volume = validate_volume(volume.into())?;
        let path = normalize(path.as_ref())?;
        Ok(Self { volume, path })
    }

    /// The root folder of `volume`.
    ///
    /// Volume names are not validated here; [`new`](Self::new) and
    /// [`FromStr`] do that.
    pub fn root(volume: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            path: PathBuf::new(),
        }
    }

    pub fn volume(&self) -> &str {
        &self.volume
    }

    /// Path relative to the volume root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// Last component of the path, if this isn't the volume root.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Append a relative path, staying within the same volume.
    pub fn join(&self, child: impl AsRef<Path>) -> Result<Self> {
        let path = normalize(&self.path.join(child.as_ref()))?;
        Ok(Self {
            volume: self.volume.clone(),
            path,
        })
    }
}

impl fmt::Display for DatastorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.is_root() {
            true => write!(f, "[{}]", self.volume),
            false => {
                let segments: Vec<_> = self.path.iter().map(|s| s.to_string_lossy()).collect();
                write!(f, "[{}] {}", self.volume, segments.join("/"))
            },
        }
    }
}

impl FromStr for DatastorePath {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some(rest) = s.strip_prefix('[') else {
            exn::bail!(ErrorKind::InvalidPath(s.to_string()));
        };
        let Some((volume, path)) = rest.split_once(']') else {
            exn::bail!(ErrorKind::InvalidPath(s.to_string()));
        };
        Self::new(volume, path.trim_start())
    }
}

fn validate_volume(volume: String) -> Result<String> {
    if volume.trim().is_empty() || matches!(volume.as_str(), "." | "..") || volume.contains(['[', ']', '\0', '/']) {
        exn::bail!(ErrorKind::InvalidPath(format!("[{volume}]")));
    }
    Ok(volume)
}

/// Resolves `.` and `..` without touching the filesystem. An empty result is
/// the volume root; anything that climbs above it is rejected.
fn normalize(path: &Path) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.display().to_string()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.display().to_string())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.display().to_string()));
                }
            },
        }
    }
    Ok(components.into_iter().collect())
}
