//! Watch mode for the styles root
//!
//! The debouncer only reports that something happened at a path.
//! [`ChangeTracker`] turns that into added/changed/removed by diffing
//! against the files it has already seen, and the resulting jobs go to the
//! [`ReconcileQueue`].

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::build::BuildContext;
use crate::queue::{Job, QueueStats, ReconcileQueue};
use crate::styles::Reconciler;
use glob::{glob, Pattern};

/// How often the loop checks the running flag while idle
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Error during watch mode
#[derive(Debug)]
pub enum WatchError {
    /// Failed to initialize file watcher
    WatcherInit(notify::Error),
    /// Failed to add watch path
    WatchPath(notify::Error),
    /// Channel receive error
    ChannelError(String),
    /// Styles directory not found
    SourceNotFound(PathBuf),
    /// The reconcile worker could not be started
    WorkerStart(std::io::Error),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::WatcherInit(e) => write!(f, "Failed to initialize file watcher: {}", e),
            WatchError::WatchPath(e) => write!(f, "Failed to watch path: {}", e),
            WatchError::ChannelError(msg) => write!(f, "Watch channel error: {}", msg),
            WatchError::SourceNotFound(path) => {
                write!(f, "Styles directory not found: {}", path.display())
            }
            WatchError::WorkerStart(e) => write!(f, "Failed to start reconcile worker: {}", e),
        }
    }
}

impl std::error::Error for WatchError {}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Styles root to watch
    pub styles_dir: PathBuf,
    /// Stylesheet extension without the dot
    pub extension: String,
    /// Debounce delay in milliseconds
    pub debounce_ms: u32,
}

impl WatchOptions {
    pub fn from_context(ctx: &BuildContext) -> Self {
        Self {
            styles_dir: ctx.styles_dir(),
            extension: ctx.config().styles.extension.clone(),
            debounce_ms: ctx.config().watch.debounce_ms,
        }
    }
}

/// Known stylesheet files, used to tell additions from changes and to
/// find what disappeared with a deleted directory.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    known: BTreeSet<PathBuf>,
    extension: String,
}

impl ChangeTracker {
    pub fn new(extension: &str) -> Self {
        Self { known: BTreeSet::new(), extension: extension.to_string() }
    }

    /// Tracker seeded with every stylesheet currently under `root`.
    pub fn scan(root: &Path, extension: &str) -> Self {
        let mut tracker = Self::new(extension);
        tracker.known = tracker.files_under(root).into_iter().collect();
        tracker
    }

    pub fn known(&self) -> &BTreeSet<PathBuf> {
        &self.known
    }

    fn is_style(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()))
    }

    fn files_under(&self, dir: &Path) -> Vec<PathBuf> {
        let pattern =
            format!("{}/**/*.{}", Pattern::escape(&dir.to_string_lossy()), self.extension);
        match glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
            Err(e) => {
                warn!("Invalid watch pattern {}: {}", pattern, e);
                Vec::new()
            }
        }
    }

    /// Jobs for something having happened at `path`.
    pub fn observe(&mut self, path: &Path) -> Vec<Job> {
        if path.is_dir() {
            return self
                .files_under(path)
                .into_iter()
                .filter(|file| self.known.insert(file.clone()))
                .map(Job::Added)
                .collect();
        }

        if path.is_file() {
            if !self.is_style(path) {
                return Vec::new();
            }
            return if self.known.insert(path.to_path_buf()) {
                vec![Job::Added(path.to_path_buf())]
            } else {
                vec![Job::Changed(path.to_path_buf())]
            };
        }

        let gone: Vec<PathBuf> =
            self.known.iter().filter(|known| known.starts_with(path)).cloned().collect();
        gone.into_iter()
            .map(|file| {
                self.known.remove(&file);
                Job::Removed(file)
            })
            .collect()
    }
}

/// Watch the styles root and feed jobs to `queue` until `running` is false.
pub fn watch_styles(
    options: &WatchOptions,
    queue: &ReconcileQueue,
    running: Arc<AtomicBool>,
) -> Result<(), WatchError> {
    if !options.styles_dir.is_dir() {
        return Err(WatchError::SourceNotFound(options.styles_dir.clone()));
    }
    let root = options
        .styles_dir
        .canonicalize()
        .map_err(|_| WatchError::SourceNotFound(options.styles_dir.clone()))?;

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(options.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer.watcher().watch(&root, RecursiveMode::Recursive).map_err(WatchError::WatchPath)?;

    let mut tracker = ChangeTracker::scan(&root, &options.extension);
    info!("Watching {} ({} stylesheets)", root.display(), tracker.known().len());

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(events)) => {
                for event in events {
                    for job in tracker.observe(&event.path) {
                        debug!(?job, "file event");
                        if !queue.submit(job) {
                            return Err(WatchError::ChannelError(
                                "reconcile worker stopped".to_string(),
                            ));
                        }
                    }
                }
            }
            Ok(Err(error)) => {
                warn!("Watch error: {:?}", error);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(WatchError::ChannelError("event channel disconnected".to_string()));
            }
        }
    }
    Ok(())
}

/// Run watch mode until Ctrl+C, then drain the queue.
pub fn run_watch(ctx: &BuildContext) -> Result<QueueStats, WatchError> {
    let options = WatchOptions::from_context(ctx);
    if !options.styles_dir.is_dir() {
        return Err(WatchError::SourceNotFound(options.styles_dir.clone()));
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    let queue = ReconcileQueue::spawn(Reconciler::from_context(ctx))
        .map_err(WatchError::WorkerStart)?;
    let watched = watch_styles(&options, &queue, running);
    info!("Stopping watcher");
    let stats = queue.shutdown();
    watched.map(|_| stats)
}
