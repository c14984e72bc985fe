use crate::error::ShellError;
use log::debug;
use nix::sys::signal::{signal, SigHandler, Signal};
use signal_hook::consts::signal::SIGTSTP;
use signal_hook::low_level;
use signal_hook::SigId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Whether `&` is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    ForegroundOnly,
}

impl Mode {
    pub fn toggled(self) -> Mode {
        match self {
            Mode::Normal => Mode::ForegroundOnly,
            Mode::ForegroundOnly => Mode::Normal,
        }
    }

    /// Notice printed when switching into this mode.
    pub fn notice(self) -> &'static str {
        match self {
            Mode::ForegroundOnly => "Entering foreground-only mode (& is now ignored)",
            Mode::Normal => "Exiting foreground-only mode",
        }
    }

    pub fn is_foreground_only(self) -> bool {
        self == Mode::ForegroundOnly
    }
}

/// Makes the shell itself immune to Ctrl-C. Children start from this
/// disposition and only foreground ones reset it.
pub fn ignore_interrupts() -> Result<(), ShellError> {
    unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) }.map_err(ShellError::Signal)?;
    Ok(())
}

/// Turns SIGTSTP deliveries into mode toggles.
///
/// The handler only counts deliveries; toggles are applied when the main
/// loop calls [`ModeController::poll`], one per delivery.
pub struct ModeController {
    received: Arc<AtomicUsize>,
    id: SigId,
}

impl ModeController {
    /// Installs the SIGTSTP handler.
    pub fn install() -> Result<Self, ShellError> {
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);
        // The action only touches an atomic, which is async-signal-safe.
        let id = unsafe {
            low_level::register(SIGTSTP, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }?;
        Ok(ModeController { received, id })
    }

    /// Applies every SIGTSTP received since the last call, printing the
    /// matching notice for each switch.
    pub fn poll(&mut self, mode: &mut Mode) {
        let count = self.received.swap(0, Ordering::SeqCst);
        for _ in 0..count {
            *mode = mode.toggled();
            debug!("mode is now {:?}", mode);
            println!("{}", mode.notice());
        }
    }
}

impl Drop for ModeController {
    fn drop(&mut self) {
        low_level::unregister(self.id);
    }
}
