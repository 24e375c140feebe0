//! Per-image detection pipeline.
//!
//! fingerprint -> result cache -> oracle on miss -> cache write -> annotation

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use super::result_cache::ExpiringBoundedCache;
use crate::domain::entities::{ElementId, ImageElement, ImageSourceKind, Verdict};
use crate::domain::errors::DetectionError;
use crate::domain::ports::{AnnotationPort, ClassificationOraclePort, FingerprintPort};

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    /// Served from the result cache.
    Cache,
    /// Fetched from the oracle.
    Oracle,
}

impl std::fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Oracle => write!(f, "oracle"),
        }
    }
}

/// What a dispatch attempt did with an image.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The element had already been dispatched in this document.
    AlreadySeen,
    /// Detection is switched off.
    Disabled,
    /// The source cannot be fetched and fingerprinted.
    Skipped(ImageSourceKind),
    /// The element was annotated.
    Annotated {
        /// Applied verdict.
        verdict: Verdict,
        /// Where the verdict came from.
        source: VerdictSource,
    },
    /// The element was left unannotated.
    Failed(DetectionError),
}

impl DispatchOutcome {
    /// Returns the applied verdict, if any.
    #[must_use]
    pub const fn verdict(&self) -> Option<&Verdict> {
        match self {
            Self::Annotated { verdict, .. } => Some(verdict),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct DetectionCounters {
    cache_hits: AtomicU64,
    oracle_queries: AtomicU64,
    flagged_ai: AtomicU64,
    verified_real: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
}

/// Snapshot of dispatcher activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionStats {
    /// Verdicts served from the cache.
    pub cache_hits: u64,
    /// Oracle queries issued.
    pub oracle_queries: u64,
    /// Images annotated as AI-generated.
    pub flagged_ai: u64,
    /// Images annotated as real.
    pub verified_real: u64,
    /// Images left unannotated because of an error.
    pub failures: u64,
    /// Images with no fetchable source.
    pub skipped: u64,
}

impl std::fmt::Display for DetectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} flagged AI, {} real, {} failed, {} skipped ({} cache hits, {} oracle queries)",
            self.flagged_ai,
            self.verified_real,
            self.failures,
            self.skipped,
            self.cache_hits,
            self.oracle_queries
        )
    }
}

struct DispatcherInner {
    cache: Arc<ExpiringBoundedCache>,
    oracle: Arc<dyn ClassificationOraclePort>,
    fingerprinter: Arc<dyn FingerprintPort>,
    annotator: Arc<dyn AnnotationPort>,
    dispatched: Mutex<HashSet<ElementId>>,
    enabled: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
    counters: DetectionCounters,
}

/// Counts a spawned dispatch until it finishes, unwinds or is cancelled.
struct InFlightGuard {
    inner: Arc<DispatcherInner>,
}

impl InFlightGuard {
    fn enter(inner: Arc<DispatcherInner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Classifies image elements at most once each and annotates the results.
///
/// Cloning is cheap; clones share marks, counters and collaborators.
#[derive(Clone)]
pub struct DetectionDispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for DetectionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionDispatcher")
            .field("enabled", &self.is_enabled())
            .field("dispatched", &self.dispatched_count())
            .finish_non_exhaustive()
    }
}

impl DetectionDispatcher {
    /// Creates a dispatcher over the given collaborators.
    #[must_use]
    pub fn new(
        cache: Arc<ExpiringBoundedCache>,
        oracle: Arc<dyn ClassificationOraclePort>,
        fingerprinter: Arc<dyn FingerprintPort>,
        annotator: Arc<dyn AnnotationPort>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                cache,
                oracle,
                fingerprinter,
                annotator,
                dispatched: Mutex::new(HashSet::new()),
                enabled: AtomicBool::new(true),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                counters: DetectionCounters::default(),
            }),
        }
    }

    /// Switches detection on or off. Elements seen while off stay unmarked.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled = enabled, "Detection toggled");
    }

    /// Returns true if detection is on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Returns true if `id` has been dispatched in this document.
    #[must_use]
    pub fn is_dispatched(&self, id: ElementId) -> bool {
        self.inner.dispatched.lock().contains(&id)
    }

    /// Returns the number of dispatched elements.
    #[must_use]
    pub fn dispatched_count(&self) -> usize {
        self.inner.dispatched.lock().len()
    }

    /// Returns activity counters.
    #[must_use]
    pub fn stats(&self) -> DetectionStats {
        let c = &self.inner.counters;
        DetectionStats {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            oracle_queries: c.oracle_queries.load(Ordering::Relaxed),
            flagged_ai: c.flagged_ai.load(Ordering::Relaxed),
            verified_real: c.verified_real.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            skipped: c.skipped.load(Ordering::Relaxed),
        }
    }

    /// Starts processing `image` in the background.
    ///
    /// Returns immediately; the result is observable only through the
    /// annotation port. Repeated calls for the same element are no-ops.
    pub fn process(&self, image: ImageElement) {
        if let Some(outcome) = self.admit(&image) {
            trace!(element = %image.id, outcome = ?outcome, "Dispatch not started");
            return;
        }

        let guard = InFlightGuard::enter(self.inner.clone());
        let this = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let id = image.id;
            let outcome = this.run(image).await;
            trace!(element = %id, outcome = ?outcome, "Background dispatch finished");
        });
    }

    /// Processes `image` and waits for the outcome.
    pub async fn dispatch(&self, image: ImageElement) -> DispatchOutcome {
        if let Some(outcome) = self.admit(&image) {
            return outcome;
        }
        self.run(image).await
    }

    /// Waits until every task started by [`process`](Self::process) finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Marks `image` as dispatched, or says why it must not run.
    ///
    /// Runs before the first suspension point so that overlapping triggers
    /// for one element cannot both pass.
    fn admit(&self, image: &ImageElement) -> Option<DispatchOutcome> {
        if !self.is_enabled() {
            return Some(DispatchOutcome::Disabled);
        }
        if !self.inner.dispatched.lock().insert(image.id) {
            return Some(DispatchOutcome::AlreadySeen);
        }
        None
    }

    async fn run(&self, image: ImageElement) -> DispatchOutcome {
        let inner = &self.inner;

        let kind = image.source_kind();
        if kind != ImageSourceKind::Remote {
            trace!(element = %image.id, kind = ?kind, "Skipping image without fetchable source");
            inner.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return DispatchOutcome::Skipped(kind);
        }

        let fingerprint = match inner.fingerprinter.fingerprint(&image).await {
            Ok(fingerprint) => fingerprint,
            Err(e) => return self.fail(&image, e),
        };
        let key = fingerprint.cache_key();

        match inner.cache.get(&key).await {
            Ok(Some(entry)) => {
                let verdict = entry.verdict();
                inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(element = %image.id, key = %key, verdict = %verdict, "Verdict served from cache");
                return self.annotate(&image, verdict, VerdictSource::Cache);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(element = %image.id, error = %e, "Result cache unreadable, treating as miss");
            }
        }

        inner.counters.oracle_queries.fetch_add(1, Ordering::Relaxed);
        let scores = match inner.oracle.classify(&fingerprint).await {
            Ok(scores) => scores,
            Err(e) => return self.fail(&image, e),
        };
        let verdict = scores.verdict();

        if let Err(e) = inner
            .cache
            .put(&key, verdict.classification, verdict.confidence)
            .await
        {
            warn!(element = %image.id, key = %key, error = %e, "Dropped result cache write");
        }

        debug!(element = %image.id, key = %key, verdict = %verdict, "Verdict fetched from oracle");
        self.annotate(&image, verdict, VerdictSource::Oracle)
    }

    fn annotate(&self, image: &ImageElement, verdict: Verdict, source: VerdictSource) -> DispatchOutcome {
        let counters = &self.inner.counters;
        if verdict.classification.is_ai() {
            counters.flagged_ai.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.verified_real.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.annotator.annotate(image, &verdict);
        DispatchOutcome::Annotated { verdict, source }
    }

    fn fail(&self, image: &ImageElement, error: DetectionError) -> DispatchOutcome {
        self.inner.counters.failures.fetch_add(1, Ordering::Relaxed);
        self.inner.annotator.report_failure(image, &error);
        DispatchOutcome::Failed(error)
    }
}
