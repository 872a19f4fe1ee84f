//! Single-worker queue for reconciliation and rebuild jobs.
//!
//! The worker owns the [`Reconciler`], so it is the only writer of the
//! aggregate and the only driver of rebuilds. Jobs that arrive while a
//! batch runs are coalesced into the next batch.

use crate::build::BuildResult;
use crate::styles::{Category, Reconciler, RemovalReport};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Work submitted to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// A stylesheet appeared
    Added(PathBuf),
    /// A stylesheet's content changed
    Changed(PathBuf),
    /// A stylesheet disappeared
    Removed(PathBuf),
    /// Rewrite all four regions, then rebuild
    ReconcileAll,
    /// Rebuild only
    Rebuild,
}

/// Jobs coalesced for one run of the worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Removed paths in arrival order, without duplicates
    pub removed: Vec<PathBuf>,
    pub added: Vec<PathBuf>,
    pub changed: Vec<PathBuf>,
    pub reconcile_all: bool,
    pub rebuild: bool,
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

impl Batch {
    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let mut batch = Batch::default();
        for job in jobs {
            match job {
                Job::Added(path) => push_unique(&mut batch.added, path),
                Job::Changed(path) => push_unique(&mut batch.changed, path),
                Job::Removed(path) => push_unique(&mut batch.removed, path),
                Job::ReconcileAll => batch.reconcile_all = true,
                Job::Rebuild => batch.rebuild = true,
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && self.changed.is_empty()
            && !self.reconcile_all
            && !self.rebuild
    }

    /// Whether any job asked for a rebuild. Removal-only batches do not.
    pub fn needs_rebuild(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty() || self.reconcile_all || self.rebuild
    }

    /// The batch is nothing but a change event for `path`.
    pub fn only_changes(&self, path: &Path) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && !self.reconcile_all
            && !self.rebuild
            && self.changed.len() == 1
            && self.changed[0] == path
    }
}

/// What a batch did.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub removals: Vec<RemovalReport>,
    /// Categories whose regions were rewritten
    pub reconciled: Vec<Category>,
    pub rebuild: Option<BuildResult>,
}

/// Run a batch: removals, then region rewrites, then at most one rebuild.
///
/// A failed region rewrite leaves the aggregate out of step with the
/// fragments, so the rebuild is skipped until a later batch succeeds.
pub fn run_batch(reconciler: &Reconciler, batch: &Batch) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let mut reconciled = true;

    for path in &batch.removed {
        info!("Removed {}", path.display());
        outcome.removals.push(reconciler.remove_one(path));
    }

    let categories: Vec<Category> = if batch.reconcile_all {
        Category::ALL.to_vec()
    } else {
        let set: BTreeSet<Category> =
            batch.added.iter().map(|p| reconciler.classify(p)).collect();
        set.into_iter().collect()
    };
    if !categories.is_empty() {
        if let Err(e) = reconciler.reconcile_regions(&categories) {
            error!("Reconciliation failed, skipping rebuild: {}", e);
            reconciled = false;
        }
        outcome.reconciled = categories;
    }

    if reconciled && batch.needs_rebuild() {
        outcome.rebuild = Some(reconciler.rebuild());
    }
    outcome
}

/// Counters returned when the worker stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Batches executed
    pub batches: usize,
    /// Rebuilds run
    pub rebuilds: usize,
    /// Batches skipped as echoes of the worker's own aggregate writes
    pub skipped: usize,
}

/// Handle to the worker thread.
pub struct ReconcileQueue {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<QueueStats>>,
}

impl ReconcileQueue {
    /// Start the worker.
    pub fn spawn(reconciler: Reconciler) -> io::Result<Self> {
        Self::spawn_with(reconciler, Vec::new())
    }

    /// Start the worker with jobs already queued; they form its first batch.
    pub fn spawn_with(reconciler: Reconciler, initial: Vec<Job>) -> io::Result<Self> {
        let (sender, receiver) = channel();
        for job in initial {
            // The receiver is alive here, so this cannot fail.
            let _ = sender.send(job);
        }
        let handle = thread::Builder::new()
            .name("assetflow-reconcile".to_string())
            .spawn(move || worker(reconciler, receiver))?;
        Ok(Self { sender: Some(sender), handle: Some(handle) })
    }

    /// Queue a job. Returns false if the worker has stopped.
    pub fn submit(&self, job: Job) -> bool {
        match &self.sender {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        }
    }

    /// Let the worker finish every queued job, then join it.
    pub fn shutdown(mut self) -> QueueStats {
        self.stop()
    }

    fn stop(&mut self) -> QueueStats {
        self.sender.take();
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                error!("Reconcile worker panicked");
                QueueStats::default()
            }
            None => QueueStats::default(),
        }
    }
}

impl Drop for ReconcileQueue {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

/// Whether a batch is only the change event caused by the worker's own
/// aggregate write: the aggregate still holds what the worker last saw.
pub fn is_own_write_echo(
    batch: &Batch,
    is_aggregate: impl Fn(&Path) -> bool,
    current: Option<&str>,
    last_seen: Option<&str>,
) -> bool {
    match batch.changed.first() {
        Some(path) => {
            is_aggregate(path.as_path())
                && batch.only_changes(path)
                && current.is_some()
                && current == last_seen
        }
        None => false,
    }
}

fn worker(reconciler: Reconciler, receiver: Receiver<Job>) -> QueueStats {
    let mut stats = QueueStats::default();
    let layout = reconciler.layout().clone();
    let mut last_seen: Option<String> = None;

    while let Ok(first) = receiver.recv() {
        let mut jobs = vec![first];
        jobs.extend(receiver.try_iter());
        let batch = Batch::from_jobs(jobs);
        if batch.is_empty() {
            continue;
        }

        let current = fs::read_to_string(&layout.aggregate).ok();
        if is_own_write_echo(
            &batch,
            |p| layout.is_aggregate(p),
            current.as_deref(),
            last_seen.as_deref(),
        ) {
            debug!("Skipping change event for unchanged aggregate");
            stats.skipped += 1;
            continue;
        }

        let outcome = run_batch(&reconciler, &batch);
        stats.batches += 1;
        if outcome.rebuild.is_some() {
            stats.rebuilds += 1;
        }
        last_seen = fs::read_to_string(&layout.aggregate).ok();
    }

    debug!(?stats, "reconcile worker stopped");
    stats
}
