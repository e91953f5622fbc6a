//! In-memory catalog for testing.

use super::VolumeStream;
use crate::error::{ErrorKind, Result};
use crate::models::{FileKind, FoundFile, SearchResult, SearchSpec, Volume};
use crate::path::DatastorePath;
use crate::{Catalog, SearchContext};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Failure to inject for a single volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Opening the search context fails.
    Open,
    /// The search call itself fails.
    Search,
    /// The search succeeds but leaves out file sizes.
    Malformed,
}

/// Call counters shared between a [`MockCatalog`] and every search context it
/// hands out.
#[derive(Debug, Default)]
pub struct MockStats {
    opened: AtomicUsize,
    searches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}
impl MockStats {
    pub fn open_calls(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Highest number of searches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total remote calls (open + search).
    pub fn remote_calls(&self) -> usize {
        self.open_calls() + self.search_calls()
    }
}

struct InFlight<'a>(&'a MockStats);
impl<'a> InFlight<'a> {
    fn enter(stats: &'a MockStats) -> Self {
        let current = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(current, Ordering::SeqCst);
        Self(stats)
    }
}
impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory catalog for testing.
///
/// Volumes and their files are fixed at construction. Failures and latency
/// can be injected per volume, and [`MockStats`] records how the catalog was
/// used so tests can assert on call counts and concurrency.
///
/// # Examples
///
/// ```
/// use dsfind_catalog::backend::{Failure, MockCatalog};
/// use dsfind_catalog::{Catalog, Volume};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = MockCatalog::default()
///     .with_files("ds1", [("vms/web.vmdk", 100)])
///     .with_volume(Volume::new("ds2").unavailable())
///     .with_failure("ds1", Failure::Search);
/// assert_eq!(catalog.list_volumes().await.unwrap().len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MockCatalog {
    name: String,
    volumes: Vec<Volume>,
    files: HashMap<String, Vec<(PathBuf, u64)>>,
    failures: HashMap<String, Failure>,
    enumeration_fails: bool,
    latency: Duration,
    stats: Arc<MockStats>,
}

impl MockCatalog {
    /// Add (or replace) a volume.
    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volumes.retain(|v| v.name != volume.name);
        self.volumes.push(volume);
        self
    }

    /// Add files to a volume, creating an accessible volume if it doesn't
    /// exist yet.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_files(mut self, volume: &str, files: impl IntoIterator<Item = (impl AsRef<Path>, u64)>) -> Self {
        if !self.volumes.iter().any(|v| v.name == volume) {
            self.volumes.push(Volume::new(volume));
        }
        let entry = self.files.entry(volume.to_string()).or_default();
        for (path, size) in files {
            let Ok(validated) = DatastorePath::new(volume, path.as_ref()) else {
                panic!("MockCatalog::with_files: invalid path {}", path.as_ref().display());
            };
            entry.push((validated.path().to_path_buf(), size));
        }
        self
    }

    pub fn with_failure(mut self, volume: impl Into<String>, failure: Failure) -> Self {
        self.failures.insert(volume.into(), failure);
        self
    }

    /// Every search sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Volume enumeration fails outright.
    pub fn failing_enumeration(mut self) -> Self {
        self.enumeration_fails = true;
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}
impl Default for MockCatalog {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            volumes: Vec::new(),
            files: HashMap::new(),
            failures: HashMap::new(),
            enumeration_fails: false,
            latency: Duration::ZERO,
            stats: Arc::default(),
        }
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn volume_stream<'a>(&'a self) -> VolumeStream<'a> {
        Box::pin(stream! {
            if self.enumeration_fails {
                yield Err(exn::Exn::from(ErrorKind::Remote(format!("{} refused to list volumes", self.name))));
                return;
            }
            for volume in &self.volumes {
                yield Ok(volume.clone());
            }
        })
    }

    async fn open_search(&self, volume: &Volume) -> Result<Box<dyn SearchContext>> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        if !self.volumes.iter().any(|v| v.name == volume.name) {
            exn::bail!(ErrorKind::NotFound(volume.name.clone()));
        }
        let failure = self.failures.get(&volume.name).copied();
        if failure == Some(Failure::Open) {
            exn::bail!(ErrorKind::Remote(format!("cannot open a session on {}", volume.name)));
        }
        Ok(Box::new(MockSearch {
            volume: volume.name.clone(),
            files: self.files.get(&volume.name).cloned().unwrap_or_default(),
            failure,
            latency: self.latency,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockSearch {
    volume: String,
    files: Vec<(PathBuf, u64)>,
    failure: Option<Failure>,
    latency: Duration,
    stats: Arc<MockStats>,
}

#[async_trait]
impl SearchContext for MockSearch {
    fn volume(&self) -> &str {
        &self.volume
    }

    async fn search(&mut self, root: &DatastorePath, spec: &SearchSpec) -> Result<Vec<SearchResult>> {
        self.stats.searches.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.stats);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if root.volume() != self.volume {
            exn::bail!(ErrorKind::InvalidPath(root.to_string()));
        }
        if self.failure == Some(Failure::Search) {
            exn::bail!(ErrorKind::Remote(format!("search failed on {}", self.volume)));
        }

        let mut results: Vec<SearchResult> = Vec::new();
        for (path, size) in &self.files {
            let parent = path.parent().unwrap_or(Path::new(""));
            if !path.starts_with(root.path()) || (!spec.recursive && parent != root.path()) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !spec.pattern.is_match(name) {
                continue;
            }
            let size = match self.failure {
                Some(Failure::Malformed) => None,
                _ => spec.details.size.then_some(*size),
            };
            let file = FoundFile {
                size,
                kind: spec.details.file_type.then(|| FileKind::from_path(name)),
                ..FoundFile::new(name)
            };
            let folder = DatastorePath::new(&self.volume, parent)?;
            match results.iter_mut().find(|r| r.folder == folder) {
                Some(result) => result.files.push(file),
                None => results.push(SearchResult { folder, files: vec![file] }),
            }
        }
        Ok(results)
    }
}
