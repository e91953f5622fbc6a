use crate::aggregate::Aggregator;
use crate::error::{ErrorKind, Result};
use crate::models::ScanReport;
use crate::progress::ProgressTracker;
use crate::reporter::{ProgressSink, report_progress};
use crate::scan::scan_volumes;
use crate::{DEFAULT_CONCURRENCY, DEFAULT_GRACE_PERIOD, DEFAULT_PROGRESS_INTERVAL, ScanContext};
use dsfind_catalog::{CatalogHandle, DatastorePath, Pattern, SearchSpec, Volume};
use exn::ResultExt;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Which of the catalog's volumes to search.
#[derive(Debug, Clone, Default)]
pub enum VolumeSelection {
    #[default]
    All,
    /// Only the named volumes. Names the catalog doesn't know are logged and
    /// ignored.
    Named(Vec<String>),
    /// Volumes whose name matches the pattern.
    Matching(Pattern),
}

impl VolumeSelection {
    pub fn apply(&self, volumes: Vec<Volume>) -> Vec<Volume> {
        match self {
            Self::All => volumes,
            Self::Named(names) => {
                for name in names.iter().filter(|name| !volumes.iter().any(|v| &v.name == *name)) {
                    tracing::warn!(volume = %name, "Requested volume is not known to the catalog");
                }
                volumes.into_iter().filter(|v| names.contains(&v.name)).collect()
            },
            Self::Matching(pattern) => volumes.into_iter().filter(|v| pattern.is_match(&v.name)).collect(),
        }
    }
}

/// A complete description of one search run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub volumes: VolumeSelection,
    pub spec: SearchSpec,
    /// Folder inside each volume to start from; empty means the volume root.
    pub prefix: PathBuf,
    pub concurrency: usize,
    pub progress_interval: Duration,
    pub grace_period: Duration,
}

impl ScanRequest {
    pub fn new(spec: SearchSpec) -> Self {
        Self {
            volumes: VolumeSelection::All,
            spec,
            prefix: PathBuf::new(),
            concurrency: DEFAULT_CONCURRENCY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_volumes(mut self, volumes: VolumeSelection) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::InvalidRequest("concurrency must be at least 1".to_string()));
        }
        if self.progress_interval.is_zero() {
            exn::bail!(ErrorKind::InvalidRequest("progress interval must be positive".to_string()));
        }
        // Any valid volume name will do; only the prefix is under test.
        DatastorePath::new("volume", &self.prefix)
            .or_raise(|| ErrorKind::InvalidRequest(format!("bad prefix {}", self.prefix.display())))?;
        Ok(())
    }

    fn context(&self, catalog: CatalogHandle, cancel: CancellationToken) -> ScanContext {
        ScanContext::new(catalog, self.spec.clone())
            .with_prefix(self.prefix.clone())
            .with_concurrency(self.concurrency)
            .with_grace_period(self.grace_period)
            .with_cancellation(cancel)
    }
}

/// Lists the catalog's volumes and narrows them down to `selection`.
///
/// This is the only fatal step of a scan: if the catalog can't enumerate its
/// volumes there is nothing to search.
#[instrument(skip_all, fields(catalog = catalog.name()))]
pub async fn discover(catalog: &CatalogHandle, selection: &VolumeSelection) -> Result<Vec<Volume>> {
    let volumes = catalog.list_volumes().await.or_raise(|| ErrorKind::Enumerate(catalog.name().to_string()))?;
    let found = volumes.len();
    let selected = selection.apply(volumes);
    tracing::info!(found, selected = selected.len(), "Volumes discovered");
    Ok(selected)
}

/// Searches every selected volume of `catalog` for files matching the
/// request, reporting progress to `sink` until all volumes are done.
///
/// Per-volume failures are collected into [`ScanReport::errors`]; only an
/// invalid request or a failed volume enumeration returns `Err`. Cancelling
/// `cancel` stops new remote calls; in-flight ones get the request's grace
/// period. The returned report is complete either way.
///
/// # Examples
///
/// ```
/// use dsfind_catalog::backend::MockCatalog;
/// use dsfind_catalog::{CatalogHandle, Pattern, SearchSpec};
/// use dsfind_scanner::{NullSink, ScanRequest, find_files};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let catalog: CatalogHandle = Arc::new(MockCatalog::default().with_files("ds1", [("vms/web.vmdk", 100)]));
/// let request = ScanRequest::new(SearchSpec::new(Pattern::new(["*.vmdk"]).unwrap()));
/// let report = find_files(&catalog, &request, &NullSink, &CancellationToken::new()).await.unwrap();
/// assert_eq!(report.matches.len(), 1);
/// assert!(report.is_clean());
/// # }
/// ```
#[instrument(skip_all, fields(pattern = %request.spec.pattern, concurrency = request.concurrency))]
pub async fn find_files(
    catalog: &CatalogHandle,
    request: &ScanRequest,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ScanReport> {
    request.validate()?;
    let started = Instant::now();
    let volumes = discover(catalog, &request.volumes).await?;
    // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
    let tracker = ProgressTracker::new(u64::try_from(volumes.len()).unwrap_or(0));
    let ctx = request.context(Arc::clone(catalog), cancel.clone());
    let finished = CancellationToken::new();
    let mut aggregator = Aggregator::default();

    let pool = async {
        let outcomes = scan_volumes(&ctx, &tracker, volumes);
        futures::pin_mut!(outcomes);
        while let Some(outcome) = outcomes.next().await {
            aggregator.push(outcome);
        }
        finished.cancel();
    };
    tokio::join!(pool, report_progress(&tracker, sink, request.progress_interval, &finished));

    let report = aggregator.finish(tracker.total(), started.elapsed());
    tracing::info!(
        matches = report.matches.len(),
        errors = report.errors.len(),
        skipped = report.skipped.len(),
        elapsed = ?report.elapsed,
        "Search complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullSink;
    use crate::scan::error::ErrorKind as ItemErrorKind;
    use dsfind_catalog::backend::{Failure, MockCatalog};
    use dsfind_catalog::{Exclusion, FileDetails};
    use rstest::rstest;
    use std::sync::Mutex;

    fn spec() -> SearchSpec {
        SearchSpec::new(Pattern::new(["*.vmdk"]).unwrap())
    }

    fn handle(catalog: MockCatalog) -> CatalogHandle {
        Arc::new(catalog)
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let catalog = MockCatalog::default()
            .with_files("A", [("f1.vmdk", 100), ("sub/f2.vmdk", 200)])
            .with_files("B", [("notes.txt", 5)])
            .with_files("C", [("f3.vmdk", 300)])
            .with_failure("C", Failure::Search);
        let request = ScanRequest::new(spec()).with_concurrency(2).with_progress_interval(Duration::from_millis(5));
        let seen = Mutex::new(Vec::new());
        let sink = |percent: f64| seen.lock().unwrap().push(percent);

        let report = find_files(&handle(catalog), &request, &sink, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.matches.len(), 2);
        assert!(report.matches.iter().all(|m| m.volume == "A"));
        assert_eq!(report.total_bytes(), 300);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(&*report.errors[0], ItemErrorKind::RemoteCall(v) if v == "C"));
        assert_eq!((report.total, report.completed), (3, 3));
        assert!(!report.cancelled);

        let seen = seen.into_inner().unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "not increasing: {seen:?}");
        assert_eq!(seen.last(), Some(&100.0));
    }

    #[tokio::test]
    async fn test_no_volumes() {
        let catalog = MockCatalog::default();
        let stats = catalog.stats();
        let seen = Mutex::new(Vec::new());
        let sink = |percent: f64| seen.lock().unwrap().push(percent);

        let report = find_files(&handle(catalog), &ScanRequest::new(spec()), &sink, &CancellationToken::new()).await;
        let report = report.unwrap();
        assert!(report.matches.is_empty() && report.errors.is_empty());
        assert_eq!(report.total, 0);
        assert_eq!(*seen.lock().unwrap(), [100.0]);
        assert_eq!(stats.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_excluded_volumes_are_skipped() {
        let catalog = MockCatalog::default()
            .with_files("live", [("a.vmdk", 1)])
            .with_files("doomed", [("b.vmdk", 1)])
            .with_volume(Volume::new("doomed").pending_deletion())
            .with_volume(Volume::new("gone").unavailable());
        let stats = catalog.stats();

        let report = find_files(&handle(catalog), &ScanRequest::new(spec()), &NullSink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().any(|s| s.volume == "doomed" && s.reason == Exclusion::PendingDeletion));
        assert!(report.skipped.iter().any(|s| s.volume == "gone" && s.reason == Exclusion::Unavailable));
        assert_eq!(report.completed, 3);
        assert_eq!(stats.open_calls(), 1);
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_fatal() {
        let catalog = MockCatalog::default().with_files("ds1", [("a.vmdk", 1)]).failing_enumeration();
        let stats = catalog.stats();
        let err = find_files(&handle(catalog), &ScanRequest::new(spec()), &NullSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Enumerate(_)));
        assert_eq!(stats.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let catalog = MockCatalog::default().with_files("ds1", [("a.vmdk", 1)]).with_files("ds2", [("b.vmdk", 1)]);
        let stats = catalog.stats();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = find_files(&handle(catalog), &ScanRequest::new(spec()), &NullSink, &cancel).await.unwrap();
        assert!(report.cancelled);
        assert!(report.matches.is_empty());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| matches!(&**e, ItemErrorKind::Cancelled(_))));
        assert_eq!(report.completed, 2);
        assert_eq!(stats.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_mid_flight() {
        let mut catalog = MockCatalog::default().with_latency(Duration::from_secs(10));
        for name in ["ds1", "ds2", "ds3", "ds4"] {
            catalog = catalog.with_files(name, [("a.vmdk", 1)]);
        }
        let stats = catalog.stats();
        let request = ScanRequest::new(spec()).with_concurrency(2).with_grace_period(Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        };

        let catalog = handle(catalog);
        let (report, ()) = tokio::join!(find_files(&catalog, &request, &NullSink, &cancel), trigger);
        let report = report.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.errors.len(), 4);
        assert_eq!(report.completed, 4);
        // Waiting volumes never reach the catalog.
        assert_eq!(stats.search_calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_within_grace_period_is_not_an_interruption() {
        let catalog = MockCatalog::default().with_files("ds1", [("a.vmdk", 1)]).with_latency(Duration::from_millis(50));
        let catalog = handle(catalog);
        let request = ScanRequest::new(spec()).with_grace_period(Duration::from_secs(10));
        let cancel = CancellationToken::new();
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        };

        let (report, ()) = tokio::join!(find_files(&catalog, &request, &NullSink, &cancel), trigger);
        let report = report.unwrap();
        assert!(cancel.is_cancelled());
        assert!(!report.cancelled);
        assert!(report.is_clean());
        assert_eq!(report.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let mut catalog = MockCatalog::default().with_latency(Duration::from_millis(10));
        for i in 0..20 {
            catalog = catalog.with_files(&format!("ds{i:02}"), [("a.vmdk", 1)]);
        }
        let stats = catalog.stats();
        let request = ScanRequest::new(spec()).with_concurrency(4);
        let report = find_files(&handle(catalog), &request, &NullSink, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.matches.len(), 20);
        assert!(stats.max_in_flight() <= 4);
    }

    #[tokio::test]
    async fn test_prefix_and_selection() {
        let catalog = MockCatalog::default()
            .with_files("prod-1", [("vms/a.vmdk", 1), ("iso/b.vmdk", 1)])
            .with_files("prod-2", [("vms/c.vmdk", 1)])
            .with_files("test-1", [("vms/d.vmdk", 1)]);
        let request = ScanRequest::new(spec())
            .with_prefix("vms")
            .with_volumes(VolumeSelection::Matching(Pattern::new(["prod-*"]).unwrap()));
        let report = find_files(&handle(catalog), &request, &NullSink, &CancellationToken::new()).await.unwrap();
        let mut paths: Vec<_> = report.matches.iter().map(|m| m.path.to_string()).collect();
        paths.sort();
        assert_eq!(paths, ["[prod-1] vms/a.vmdk", "[prod-2] vms/c.vmdk"]);
    }

    #[tokio::test]
    async fn test_details_off_accepts_missing_sizes() {
        let catalog = MockCatalog::default().with_files("ds1", [("a.vmdk", 7)]);
        let details = FileDetails { size: false, ..FileDetails::default() };
        let request = ScanRequest::new(spec().with_details(details));
        let report = find_files(&handle(catalog), &request, &NullSink, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.matches[0].size, 0);
    }

    #[test]
    fn test_named_selection_ignores_unknown() {
        let volumes = vec![Volume::new("a"), Volume::new("b"), Volume::new("c")];
        let selection = VolumeSelection::Named(vec!["c".to_string(), "zz".to_string(), "a".to_string()]);
        let names: Vec<_> = selection.apply(volumes).into_iter().map(|v| v.name).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[rstest]
    #[case(ScanRequest::new(spec()).with_concurrency(0))]
    #[case(ScanRequest::new(spec()).with_progress_interval(Duration::ZERO))]
    #[case(ScanRequest::new(spec()).with_prefix("../outside"))]
    fn test_invalid_request(#[case] request: ScanRequest) {
        let err = request.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRequest(_)));
    }
}
