//! Frame-coalesced rendering.
//!
//! Edits can arrive faster than a render completes. Requests are therefore
//! never run directly: each one replaces whatever is pending, and a frame
//! runs at most the latest request. A burst of edits inside one frame costs
//! one render.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, trace, warn};

/// Default watch frame interval.
pub const FRAME: Duration = Duration::from_millis(100);

/// Holds at most one pending render request.
#[derive(Debug)]
pub struct RenderScheduler<R> {
    pending: Option<R>,
    cancelled: u64,
}

impl<R> Default for RenderScheduler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RenderScheduler<R> {
    pub fn new() -> Self {
        Self {
            pending: None,
            cancelled: 0,
        }
    }

    /// Queue a render for the next frame. Returns `true` when an earlier
    /// request was cancelled by this one.
    pub fn request(&mut self, request: R) -> bool {
        let replaced = self.pending.replace(request).is_some();
        if replaced {
            self.cancelled += 1;
            trace!("pending render replaced");
        }
        replaced
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Requests dropped in favor of a later one so far.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }

    /// Run the pending request, if any.
    pub fn run_frame<T>(&mut self, render: impl FnOnce(R) -> T) -> Option<T> {
        self.pending.take().map(render)
    }
}

/// Modification time and length of a file; `None` when it does not exist.
type Fingerprint = Option<(Option<SystemTime>, u64)>;

fn fingerprint(path: &Path) -> Fingerprint {
    std::fs::metadata(path)
        .ok()
        .map(|m| (m.modified().ok(), m.len()))
}

/// Polls a file and reports changes since the previous poll.
#[derive(Debug)]
pub struct FileWatcher {
    path: PathBuf,
    last: Fingerprint,
}

impl FileWatcher {
    /// Start watching. The current state of the file counts as seen.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last = fingerprint(&path);
        Self { path, last }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn poll(&mut self) -> bool {
        let now = fingerprint(&self.path);
        if now != self.last {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Re-renders whenever the watched file changes.
pub struct WatchLoop {
    watcher: FileWatcher,
    scheduler: RenderScheduler<()>,
    frame: Duration,
}

impl WatchLoop {
    /// The first frame renders once even if the file does not change.
    pub fn new(path: impl Into<PathBuf>, frame: Duration) -> Self {
        let mut scheduler = RenderScheduler::new();
        scheduler.request(());
        Self {
            watcher: FileWatcher::new(path),
            scheduler,
            frame,
        }
    }

    /// Poll once and run the frame. Render failures are logged and the loop
    /// keeps going; returns whether a render ran.
    pub fn tick<E: std::fmt::Display>(&mut self, render: impl FnOnce() -> Result<(), E>) -> bool {
        if self.watcher.poll() {
            debug!(path = %self.watcher.path().display(), "form file changed");
            self.scheduler.request(());
        }
        match self.scheduler.run_frame(|()| render()) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                warn!("render failed: {}", e);
                true
            }
            None => false,
        }
    }

    /// Tick forever, sleeping one frame between polls.
    pub fn run<E: std::fmt::Display>(&mut self, mut render: impl FnMut() -> Result<(), E>) {
        loop {
            self.tick(&mut render);
            std::thread::sleep(self.frame);
        }
    }
}
