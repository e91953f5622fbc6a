use crate::ScanContext;
use crate::models::{MatchRecord, SkippedVolume};
use crate::progress::ProgressTracker;
use crate::scan::error::{Error, ErrorKind, Result};
use dsfind_catalog::error::{ErrorKind as CatalogErrorKind, Result as CatalogResult};
use dsfind_catalog::{DatastorePath, FileDetails, SearchResult, Volume};
use exn::ResultExt;
use tracing::instrument;

/// What happened to one volume.
#[derive(Debug)]
pub enum VolumeOutcome {
    /// The volume was searched; `matches` may well be empty.
    Matched { volume: String, matches: Vec<MatchRecord> },
    /// The volume is pending deletion or unavailable and was not contacted.
    Skipped(SkippedVolume),
    Failed(Error),
}
impl VolumeOutcome {
    pub fn volume(&self) -> &str {
        match self {
            Self::Matched { volume, .. } => volume,
            Self::Skipped(skipped) => &skipped.volume,
            Self::Failed(err) => err.volume(),
        }
    }
}

/// Decrements the tracker when the volume task ends, however it ends.
struct Completion<'a>(&'a ProgressTracker);
impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.0.complete_one();
    }
}

/// Searches a single volume, turning every failure into a [`VolumeOutcome`].
///
/// Excluded volumes are skipped without a single remote call. The tracker is
/// decremented exactly once when this future finishes.
#[instrument(skip_all, fields(volume = %volume.name))]
pub(crate) async fn scan_volume(ctx: &ScanContext, tracker: &ProgressTracker, volume: Volume) -> VolumeOutcome {
    let _completion = Completion(tracker);
    if let Some(reason) = volume.exclusion() {
        tracing::info!(%reason, "Skipping excluded volume");
        return VolumeOutcome::Skipped(SkippedVolume { volume: volume.name, reason });
    }
    match search_volume(ctx, &volume).await {
        Ok(matches) => {
            tracing::debug!(matches = matches.len(), "Volume searched");
            VolumeOutcome::Matched { volume: volume.name, matches }
        },
        Err(err) => {
            tracing::warn!(error = ?err, "Volume search failed");
            VolumeOutcome::Failed(err)
        },
    }
}

async fn search_volume(ctx: &ScanContext, volume: &Volume) -> Result<Vec<MatchRecord>> {
    let name = volume.name.as_str();
    let failed = || ErrorKind::RemoteCall(name.to_string());
    let root = DatastorePath::new(name, &ctx.prefix).or_raise(failed)?;

    ensure_active(ctx, name)?;
    let mut search = until_cancelled(ctx, name, ctx.catalog.open_search(volume)).await?.or_raise(failed)?;
    ensure_active(ctx, name)?;
    let results = until_cancelled(ctx, name, search.search(&root, &ctx.spec)).await?.or_raise(failed)?;
    to_records(name, results, &ctx.spec.details).or_raise(failed)
}

fn ensure_active(ctx: &ScanContext, volume: &str) -> Result<()> {
    if ctx.cancel.is_cancelled() {
        exn::bail!(ErrorKind::Cancelled(volume.to_string()));
    }
    Ok(())
}

/// Runs a remote call to completion unless the scan is cancelled, in which
/// case the call gets the context's grace period to finish before it is
/// dropped.
async fn until_cancelled<F: Future>(ctx: &ScanContext, volume: &str, call: F) -> Result<F::Output> {
    tokio::pin!(call);
    tokio::select! {
        biased;
        output = &mut call => return Ok(output),
        () = ctx.cancel.cancelled() => {},
    }
    tracing::debug!(grace_period = ?ctx.grace_period, "Cancelled while a remote call was in flight");
    match tokio::time::timeout(ctx.grace_period, call).await {
        Ok(output) => Ok(output),
        Err(_elapsed) => exn::bail!(ErrorKind::Cancelled(volume.to_string())),
    }
}

/// Flattens per-folder results into match records, refusing answers that
/// lack requested fields or point outside the volume.
fn to_records(volume: &str, results: Vec<SearchResult>, details: &FileDetails) -> CatalogResult<Vec<MatchRecord>> {
    let mut records = Vec::new();
    for SearchResult { folder, files } in results {
        if folder.volume() != volume {
            exn::bail!(CatalogErrorKind::MalformedResult(format!("folder {folder} is outside volume {volume}")));
        }
        for file in files {
            if file.path.is_empty() {
                exn::bail!(CatalogErrorKind::MalformedResult(format!("unnamed file in {folder}")));
            }
            let size = match file.size {
                Some(size) => size,
                None if details.size => {
                    exn::bail!(CatalogErrorKind::MalformedResult(format!("no size for {} in {folder}", file.path)))
                },
                None => 0,
            };
            let path = folder.join(&file.path)?;
            records.push(MatchRecord {
                volume: volume.to_string(),
                folder: folder.clone(),
                path,
                size,
                modified: file.modified,
                owner: file.owner,
                kind: file.kind,
            });
        }
    }
    Ok(records)
}
