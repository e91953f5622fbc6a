//! Local directory catalog.
//!
//! Treats every immediate subdirectory of a root directory as a volume. This
//! is how mounted datastores (NFS exports, VMFS mounts on a service host)
//! look from the outside, and it's enough to drive the scanner without a
//! management server.

use super::VolumeStream;
use crate::error::{ErrorKind, Result};
use crate::models::{FileKind, FoundFile, SearchResult, SearchSpec, Volume};
use crate::path::DatastorePath;
use crate::{Catalog, SearchContext};
use async_stream::stream;
use async_trait::async_trait;
use std::fmt::Display;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};

/// A volume containing a file with this name is reported as pending deletion.
pub const PENDING_DELETION_MARKER: &str = ".dsfind-pending-deletion";

enum WalkEntry {
    File(FoundFile),
    Descend(DatastorePath),
    Skip,
}

/// Local directory catalog.
///
/// # Examples
///
/// ```no_run
/// use dsfind_catalog::backend::LocalCatalog;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = LocalCatalog::new("mounts", "/mnt/datastores")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    name: String,
    /// Directory whose subdirectories are the volumes
    root: PathBuf,
}
impl LocalCatalog {
    /// Create a new local catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root.display().to_string()));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turn one directory entry of the root into a volume, if it is one.
    async fn describe(&self, entry: DirEntry) -> Option<Volume> {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::warn!(path = %entry.path().display(), "Ignoring volume with a non UTF-8 name");
            return None;
        };
        if name.starts_with('.') || DatastorePath::new(name, "").is_err() {
            return None;
        }
        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {},
            Ok(_) => return None,
            // A symlink pointing nowhere is a volume whose mount has gone away.
            Err(_) if fs::symlink_metadata(&path).await.is_ok() => return Some(Volume::new(name).unavailable()),
            Err(_) => return None,
        }
        let mut volume = Volume::new(name);
        volume.accessible = fs::read_dir(&path).await.is_ok();
        volume.pending_deletion = fs::try_exists(path.join(PENDING_DELETION_MARKER)).await.unwrap_or(false);
        Some(volume)
    }
}

#[async_trait]
impl Catalog for LocalCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn volume_stream<'a>(&'a self) -> VolumeStream<'a> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(err) => {
                    yield Err(exn::Exn::from(map_io_error(err, self.root.display())));
                    return;
                },
            };
            // Directory order is arbitrary; sort so listings are stable.
            let mut volumes = Vec::new();
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => volumes.extend(self.describe(entry).await),
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(exn::Exn::from(map_io_error(err, self.root.display())));
                        return;
                    },
                }
            }
            volumes.sort_by(|a: &Volume, b: &Volume| a.name.cmp(&b.name));
            for volume in volumes {
                yield Ok(volume);
            }
        })
    }

    async fn open_search(&self, volume: &Volume) -> Result<Box<dyn SearchContext>> {
        let root = DatastorePath::new(&volume.name, "")?;
        let path = self.root.join(&volume.name);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {},
            Ok(_) => exn::bail!(ErrorKind::NotFound(root.to_string())),
            Err(err) => return Err(exn::Exn::from(map_io_error(err, &root))),
        }
        if let Err(err) = fs::read_dir(&path).await {
            tracing::debug!(volume = %volume.name, error = %err, "Volume directory is not readable");
            exn::bail!(ErrorKind::Unavailable(volume.name.clone()));
        }
        Ok(Box::new(LocalSearch {
            volume: volume.name.clone(),
            root: path,
        }))
    }
}

/// Search session over one volume directory.
#[derive(Debug)]
pub struct LocalSearch {
    volume: String,
    root: PathBuf,
}
impl LocalSearch {
    async fn process_entry(&self, entry: DirEntry, folder: &DatastorePath, spec: &SearchSpec) -> Result<WalkEntry> {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            return Ok(WalkEntry::Skip);
        };
        if name == PENDING_DELETION_MARKER {
            return Ok(WalkEntry::Skip);
        }
        let Ok(metadata) = entry.metadata().await else {
            return Ok(WalkEntry::Skip);
        };
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(folder.join(name)?));
        }
        // Links to files are reported with their target's metadata. Links to
        // folders are never descended, so a link back up can't loop the walk.
        let metadata = match metadata.is_symlink() {
            true => match fs::metadata(entry.path()).await {
                Ok(target) if target.is_file() => target,
                _ => return Ok(WalkEntry::Skip),
            },
            false => metadata,
        };
        if metadata.is_file() && spec.pattern.is_match(name) {
            return Ok(WalkEntry::File(found_file(name, &metadata, spec)));
        }
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl SearchContext for LocalSearch {
    fn volume(&self) -> &str {
        &self.volume
    }

    async fn search(&mut self, root: &DatastorePath, spec: &SearchSpec) -> Result<Vec<SearchResult>> {
        if root.volume() != self.volume {
            exn::bail!(ErrorKind::InvalidPath(root.to_string()));
        }
        match fs::metadata(self.root.join(root.path())).await {
            Ok(metadata) if metadata.is_dir() => {},
            Ok(_) => exn::bail!(ErrorKind::InvalidPath(root.to_string())),
            Err(err) => return Err(exn::Exn::from(map_io_error(err, root))),
        }

        let mut results = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(folder) = stack.pop() {
            let mut entries = match fs::read_dir(self.root.join(folder.path())).await {
                Ok(entries) => entries,
                Err(err) if folder != *root => {
                    tracing::warn!(folder = %folder, error = %err, "Skipping unreadable folder");
                    continue;
                },
                Err(err) => return Err(exn::Exn::from(map_io_error(err, &folder))),
            };
            let mut files = Vec::new();
            while let Some(entry) = entries.next_entry().await.map_err(|err| map_io_error(err, &folder))? {
                match self.process_entry(entry, &folder, spec).await? {
                    WalkEntry::File(file) => files.push(file),
                    WalkEntry::Descend(child) if spec.recursive => stack.push(child),
                    WalkEntry::Descend(_) | WalkEntry::Skip => {},
                }
            }
            if !files.is_empty() {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                results.push(SearchResult { folder, files });
            }
        }
        results.sort_by(|a, b| a.folder.cmp(&b.folder));
        Ok(results)
    }
}

fn found_file(name: &str, metadata: &Metadata, spec: &SearchSpec) -> FoundFile {
    let details = &spec.details;
    FoundFile {
        path: name.to_string(),
        size: details.size.then(|| metadata.len()),
        modified: details.modified.then(|| metadata.modified().ok().map(OffsetDateTime::from)).flatten(),
        owner: details.owner.then(|| owner(metadata)).flatten(),
        kind: details.file_type.then(|| FileKind::from_path(name)),
    }
}

#[cfg(unix)]
fn owner(metadata: &Metadata) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.uid().to_string())
}

#[cfg(not(unix))]
fn owner(_metadata: &Metadata) -> Option<String> {
    None
}

fn map_io_error(err: std::io::Error, location: impl Display) -> ErrorKind {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(location.to_string()),
        std::io::ErrorKind::PermissionDenied => ErrorKind::Unavailable(location.to_string()),
        _ => ErrorKind::Io(err),
    }
}
