use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type WidthProbe = Arc<dyn Fn() -> Option<u16> + Send + Sync>;

/// Level-triggered resize flag.
///
/// The signal handler only flips the flag. The engine polls it with
/// [`take_pending`](Self::take_pending) at its safe points and does all
/// protocol work itself.
#[derive(Clone)]
pub struct ResizeWatcher {
    pending: Arc<AtomicBool>,
    probe: WidthProbe,
}

impl ResizeWatcher {
    pub fn new<F>(probe: F) -> Self
    where
        F: Fn() -> Option<u16> + Send + Sync + 'static,
    {
        Self {
            pending: Arc::new(AtomicBool::new(false)),
            probe: Arc::new(probe),
        }
    }

    /// Watcher bound to the controlling terminal. On unix the flag is set
    /// from SIGWINCH; elsewhere only explicit [`notify`](Self::notify) calls set it.
    pub fn for_terminal() -> Self {
        let watcher = Self::new(terminal_width);
        #[cfg(unix)]
        {
            use signal_hook::consts::SIGWINCH;
            if let Err(err) = signal_hook::flag::register(SIGWINCH, Arc::clone(&watcher.pending)) {
                tracing::warn!(target: "beach_console::resize", error = %err, "resize notifications unavailable");
            }
        }
        watcher
    }

    pub fn notify(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Clears the flag, returning whether it was set.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    pub fn current_width(&self) -> Option<u16> {
        (self.probe)()
    }
}

impl Default for ResizeWatcher {
    fn default() -> Self {
        Self::new(|| None)
    }
}

impl fmt::Debug for ResizeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeWatcher")
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

pub fn terminal_width() -> Option<u16> {
    crossterm::terminal::size()
        .ok()
        .map(|(cols, _)| cols)
        .filter(|cols| *cols > 0)
}
