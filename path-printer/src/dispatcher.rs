//! Print dispatch with a scoped, short-lived print surface
//!
//! Each print job materialises its label as a surface document inside an
//! anchor directory, hands it to a [`Printer`], and tears it down again once
//! the printer has had time to spool it. At most one surface per dispatcher
//! exists at any time:
//!
//! - a new job first tears down the surface left by the previous one
//! - stale surfaces found in the anchor (e.g. after a crash) are swept:
//!   leftovers of this process at once, other processes' only once they
//!   are older than [`STALE_AFTER`]
//! - a failed job tears its surface down immediately
//! - [`PrintDispatcher::flush`] and dropping the dispatcher release the
//!   pending surface

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::layout::RenderTree;
use crate::printer::Printer;
use crate::surface::{SURFACE_CLASS, render_print_document};

/// File extension of surface documents
const SURFACE_EXT: &str = "html";

/// Default time a surface outlives a successful print call
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Age after which another process's surface counts as abandoned
pub const STALE_AFTER: Duration = Duration::from_secs(60);

/// A print surface on disk. The file is removed when the value is dropped.
#[derive(Debug)]
pub struct PrintSurface {
    id: u64,
    path: PathBuf,
    tree: RenderTree,
}

impl PrintSurface {
    fn create(anchor: &Path, id: u64, tree: RenderTree) -> PrintResult<Self> {
        let path = anchor.join(format!(
            "{SURFACE_CLASS}-{}-{id}.{SURFACE_EXT}",
            std::process::id()
        ));
        std::fs::write(&path, render_print_document(&tree))?;
        debug!(id, path = %path.display(), "Print surface created");
        Ok(Self { id, path, tree })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Location of the surface document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The label drawn on this surface
    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }
}

impl Drop for PrintSurface {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(id = self.id, "Print surface removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(id = self.id, error = %e, "Failed to remove print surface"),
        }
    }
}

/// Whether a file name belongs to a print surface
fn is_surface_file(name: &str) -> bool {
    name.starts_with(SURFACE_CLASS) && name.ends_with(SURFACE_EXT)
}

/// Process id embedded in a surface file name
fn surface_pid(name: &str) -> Option<u32> {
    name.strip_prefix(SURFACE_CLASS)?
        .strip_prefix('-')?
        .split('-')
        .next()?
        .parse()
        .ok()
}

/// Prints labels through a scoped surface.
///
/// Calls to [`print_once`](Self::print_once) are serialised, so a rapid
/// second call waits for the first and then replaces its surface.
pub struct PrintDispatcher<P: Printer> {
    anchor: PathBuf,
    printer: P,
    settle: Duration,
    next_id: AtomicU64,
    pending: Arc<Mutex<Option<PrintSurface>>>,
    busy: tokio::sync::Mutex<()>,
}

impl<P: Printer> PrintDispatcher<P> {
    pub fn new(anchor: impl Into<PathBuf>, printer: P) -> Self {
        Self {
            anchor: anchor.into(),
            printer,
            settle: DEFAULT_SETTLE,
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(None)),
            busy: tokio::sync::Mutex::new(()),
        }
    }

    /// How long a surface is kept after the printer accepted it
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn anchor(&self) -> &Path {
        &self.anchor
    }

    pub fn printer(&self) -> &P {
        &self.printer
    }

    /// Id of the surface still awaiting teardown, if any
    pub fn pending_surface(&self) -> Option<u64> {
        self.pending.lock().as_ref().map(PrintSurface::id)
    }

    /// Print a laid-out label once.
    ///
    /// Fails with [`PrintError::SurfaceAnchorMissing`] when the anchor
    /// directory does not exist; nothing is created in that case.
    #[instrument(skip(self, tree), fields(anchor = %self.anchor.display(), format = %tree.format))]
    pub async fn print_once(&self, tree: RenderTree) -> PrintResult<()> {
        let _guard = self.busy.lock().await;

        self.teardown_pending();

        if !self.anchor.is_dir() {
            warn!("Print surface anchor is missing");
            return Err(PrintError::SurfaceAnchorMissing(self.anchor.clone()));
        }
        self.sweep_stale()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let surface = PrintSurface::create(&self.anchor, id, tree)?;

        if let Err(e) = self.printer.print(&surface).await {
            warn!(id, error = %e, "Print failed, tearing down surface");
            return Err(e);
        }

        info!(id, "Label printed");

        if self.settle.is_zero() {
            return Ok(());
        }

        *self.pending.lock() = Some(surface);

        let pending = Arc::clone(&self.pending);
        let settle = self.settle;
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            let mut slot = pending.lock();
            if slot.as_ref().is_some_and(|s| s.id() == id) {
                slot.take();
            }
        });

        Ok(())
    }

    /// Tear down the pending surface now instead of after the settle delay
    pub fn flush(&self) {
        self.teardown_pending();
    }

    fn teardown_pending(&self) {
        if let Some(surface) = self.pending.lock().take() {
            debug!(id = surface.id(), "Tearing down previous surface");
        }
    }

    /// Remove surfaces left behind by earlier runs.
    ///
    /// Surfaces carrying this process's id are removed outright. Surfaces
    /// of other processes may still be spooling and are only removed once
    /// untouched for the longer of [`STALE_AFTER`] and the settle delay.
    fn sweep_stale(&self) -> PrintResult<()> {
        let own_pid = std::process::id();
        let max_age = self.settle.max(STALE_AFTER);
        let now = SystemTime::now();

        for entry in std::fs::read_dir(&self.anchor)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_surface_file(name) {
                continue;
            }
            if surface_pid(name) != Some(own_pid) {
                let age = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age < max_age {
                    debug!(file = name, ?age, "Keeping recent surface of another process");
                    continue;
                }
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => info!(file = name, "Removed stale print surface"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl<P: Printer> Drop for PrintDispatcher<P> {
    fn drop(&mut self) {
        self.teardown_pending();
    }
}
