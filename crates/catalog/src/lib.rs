//! Catalog client interface for datastore file searches.
//!
//! A [`Catalog`] is the remote collaborator that knows which volumes
//! (datastores) exist and how to search them. Everything vendor-specific
//! lives behind that trait; this crate only defines the shape of the
//! conversation:
//!
//! - **List volumes** ([`Catalog::volume_stream`], [`Catalog::list_volumes`])
//! - **Open a search context** for exactly one volume ([`Catalog::open_search`])
//! - **Search** that context for file names matching a [`Pattern`]
//!   ([`SearchContext::search`])
//!
//! Two backends ship with the crate: [`LocalCatalog`](backend::LocalCatalog),
//! which treats every subdirectory of a root directory as a volume, and
//! `MockCatalog` (behind the `mock` feature) for tests.

pub mod backend;
pub mod error;
mod models;
mod path;
mod pattern;

pub use crate::backend::{Catalog, SearchContext};
pub use crate::models::{Exclusion, FileDetails, FileKind, FoundFile, SearchResult, SearchSpec, Volume};
pub use crate::path::DatastorePath;
pub use crate::pattern::Pattern;
use std::sync::Arc;

pub type CatalogHandle = Arc<dyn Catalog + Send + Sync>;
