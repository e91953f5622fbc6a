use crate::ScanContext;
use crate::error::Result;
use crate::job::{VolumeSelection, discover};
use crate::progress::ProgressTracker;
use crate::scan::volume::{VolumeOutcome, scan_volume};
use async_stream::stream;
use dsfind_catalog::Volume;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

/// Events emitted by [`scan`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of selected volumes.
/// 3. [`Scanned`](Self::Scanned) once per selected volume.
/// 4. [`Complete`](Self::Complete) exactly once.
///
/// A discovery failure ends the stream with an `Err` right after
/// [`Started`](Self::Started).
#[derive(Debug)]
pub enum ScanEvent {
    Started,
    DiscoveryComplete(u64),
    Scanned(VolumeOutcome),
    Complete,
}

/// Searches every volume in `volumes`, never more than
/// [`ScanContext::concurrency`] at a time, yielding outcomes as they finish.
///
/// Waiting volumes are started in the order given as soon as a slot frees up.
/// Exactly one outcome is yielded per volume, and `tracker` is decremented
/// once per volume before its outcome is yielded.
pub fn scan_volumes<'a>(
    ctx: &'a ScanContext,
    tracker: &'a ProgressTracker,
    volumes: Vec<Volume>,
) -> impl Stream<Item = VolumeOutcome> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let limit = ctx.concurrency.max(1);
        let mut pending: VecDeque<Volume> = volumes.into();
        let mut processing = FuturesUnordered::new();
        processing.extend(pending.drain(..limit.min(pending.len())).map(|volume| scan_volume(ctx, tracker, volume)));
        while let Some(outcome) = processing.next().await {
            // Pop-n-push, FIFO.
            if let Some(volume) = pending.pop_front() {
                processing.push(scan_volume(ctx, tracker, volume));
            }
            yield outcome;
        }
    })
}

/// Discovers the volumes picked by `selection` and searches them, streaming
/// [`ScanEvent`]s in the order documented there.
pub fn scan<'a>(ctx: &'a ScanContext, selection: &'a VolumeSelection) -> impl Stream<Item = Result<ScanEvent>> + 'a {
    stream!({
        yield Ok(ScanEvent::Started);

        let volumes = match discover(&ctx.catalog, selection).await {
            Ok(volumes) => volumes,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        let tracker = ProgressTracker::new(u64::try_from(volumes.len()).unwrap_or(0));
        yield Ok(ScanEvent::DiscoveryComplete(tracker.total()));

        let outcomes = scan_volumes(ctx, &tracker, volumes);
        futures::pin_mut!(outcomes);
        while let Some(outcome) = outcomes.next().await {
            yield Ok(ScanEvent::Scanned(outcome));
        }

        yield Ok(ScanEvent::Complete);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use dsfind_catalog::backend::MockCatalog;
    use dsfind_catalog::{Catalog, Pattern, SearchSpec};
    use std::sync::Arc;
    use std::time::Duration;

    fn spec() -> SearchSpec {
        SearchSpec::new(Pattern::new(["*.vmdk"]).unwrap())
    }

    #[tokio::test]
    async fn test_pool_respects_limit() {
        let mut catalog = MockCatalog::default().with_latency(Duration::from_millis(20));
        for i in 0..12 {
            catalog = catalog.with_files(&format!("ds{i:02}"), [("a.vmdk", 1)]);
        }
        let stats = catalog.stats();
        let volumes = catalog.list_volumes().await.unwrap();
        let ctx = ScanContext::new(Arc::new(catalog), spec()).with_concurrency(3);
        let tracker = ProgressTracker::new(12);

        let outcomes: Vec<_> = scan_volumes(&ctx, &tracker, volumes).collect().await;
        assert_eq!(outcomes.len(), 12);
        assert_eq!(stats.max_in_flight(), 3);
        assert_eq!(stats.search_calls(), 12);
        assert!(tracker.is_finished());
    }

    #[tokio::test]
    async fn test_pool_starts_in_order() {
        let catalog = MockCatalog::default()
            .with_files("a", [("a.vmdk", 1)])
            .with_files("b", [("b.vmdk", 1)])
            .with_files("c", [("c.vmdk", 1)]);
        let volumes = catalog.list_volumes().await.unwrap();
        let ctx = ScanContext::new(Arc::new(catalog), spec()).with_concurrency(1);
        let tracker = ProgressTracker::new(3);

        let names: Vec<_> =
            scan_volumes(&ctx, &tracker, volumes).map(|outcome| outcome.volume().to_string()).collect().await;
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_pool_without_volumes() {
        let catalog = MockCatalog::default();
        let stats = catalog.stats();
        let ctx = ScanContext::new(Arc::new(catalog), spec());
        let tracker = ProgressTracker::new(0);
        let outcomes: Vec<_> = scan_volumes(&ctx, &tracker, Vec::new()).collect().await;
        assert!(outcomes.is_empty());
        assert_eq!(stats.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_event_order() {
        let catalog = MockCatalog::default().with_files("ds1", [("a.vmdk", 1)]).with_files("ds2", [("b.iso", 1)]);
        let ctx = ScanContext::new(Arc::new(catalog), spec());
        let events: Vec<_> = scan(&ctx, &VolumeSelection::All).collect().await;
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], Ok(ScanEvent::Started)));
        assert!(matches!(events[1], Ok(ScanEvent::DiscoveryComplete(2))));
        assert!(matches!(events[2], Ok(ScanEvent::Scanned(_))));
        assert!(matches!(events[3], Ok(ScanEvent::Scanned(_))));
        assert!(matches!(events[4], Ok(ScanEvent::Complete)));
    }

    #[tokio::test]
    async fn test_event_stream_discovery_failure() {
        let ctx = ScanContext::new(Arc::new(MockCatalog::default().failing_enumeration()), spec());
        let events: Vec<_> = scan(&ctx, &VolumeSelection::All).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Ok(ScanEvent::Started)));
        assert!(matches!(&events[1], Err(e) if matches!(&**e, ErrorKind::Enumerate(_))));
    }
}
