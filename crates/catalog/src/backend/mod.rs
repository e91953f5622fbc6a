//! Catalog trait and implementations.
//!
//! This module defines the [`Catalog`] trait (volume enumeration) and the
//! [`SearchContext`] trait (a per-volume browsing session), which together
//! form the whole contract between the scanner and whatever management
//! server actually owns the volumes.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalCatalog;
#[cfg(feature = "mock")]
pub use self::mock::{Failure, MockCatalog, MockStats};
use crate::error::Result;
use crate::models::{SearchResult, SearchSpec, Volume};
use crate::path::DatastorePath;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub(crate) type VolumeStream<'a> = Pin<Box<dyn Stream<Item = Result<Volume>> + Send + 'a>>;

/// Unified interface for volume catalogs.
///
/// All operations are asynchronous; a real catalog talks to a management
/// server over the network.
///
/// # Examples
///
/// ```
/// use dsfind_catalog::{Catalog, DatastorePath, Pattern, SearchSpec, error::Result};
///
/// async fn count_disks(catalog: &dyn Catalog) -> Result<usize> {
///     let spec = SearchSpec::new(Pattern::new(["*.vmdk"])?);
///     let mut found = 0;
///     for volume in catalog.list_volumes().await? {
///         if volume.exclusion().is_some() {
///             continue;
///         }
///         let mut search = catalog.open_search(&volume).await?;
///         let results = search.search(&DatastorePath::root(&volume.name), &spec).await?;
///         found += results.iter().map(|r| r.files.len()).sum::<usize>();
///     }
///     Ok(found)
/// }
/// ```
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Name of the configured catalog, used for logging only.
    fn name(&self) -> &str;

    /// List every volume known to the catalog.
    ///
    /// Default implementation collects [`volume_stream()`](Self::volume_stream)
    /// into a [`Vec`].
    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        self.volume_stream().try_collect().await
    }

    /// Stream volumes as the catalog enumerates them.
    ///
    /// Volumes that are pending deletion or unavailable are still yielded;
    /// it's up to the caller to honour [`Volume::exclusion`].
    fn volume_stream<'a>(&'a self) -> VolumeStream<'a>;

    /// Open a browsing session scoped to one volume.
    ///
    /// Sessions are never shared between volumes or between concurrent
    /// searches. Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// catalog doesn't know the volume and
    /// [`Unavailable`](crate::error::ErrorKind::Unavailable) if it can't be
    /// browsed right now.
    async fn open_search(&self, volume: &Volume) -> Result<Box<dyn SearchContext>>;
}

/// A search session for a single volume.
#[async_trait]
pub trait SearchContext: Send {
    /// Name of the volume this session is bound to.
    fn volume(&self) -> &str;

    /// Search `root` (and, if [`SearchSpec::recursive`], every folder below
    /// it) for file names matching `spec.pattern`.
    ///
    /// Returns one [`SearchResult`] per folder that holds at least one match;
    /// an empty [`Vec`] is a perfectly good answer.
    async fn search(&mut self, root: &DatastorePath, spec: &SearchSpec) -> Result<Vec<SearchResult>>;
}
