//! The global job table and the signal mask that guards it
//!
//! There is exactly one `JobTable` per shell. It is shared between the main
//! flow and the handlers in [`crate::relay`], and a handler can interrupt the
//! main flow at any instruction, so a lock would deadlock the moment a handler
//! tried to take it from under its own holder. Instead:
//!
//! - the main flow reaches the table only through [`with_jobs`], which blocks
//!   SIGCHLD, SIGINT and SIGTSTP around the closure;
//! - the handlers are installed with those same three signals in their
//!   `sa_mask`, so no handler ever interrupts another handler or a
//!   `with_jobs` closure.
//!
//! Each side therefore sees the table either fully before or fully after the
//! other's update.

use core::cell::UnsafeCell;

use conquer_once::spin::OnceCell;
use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};

use crate::error::{Error, Result};
use crate::job::JobTable;

/// Signals whose handlers read or write the job table
pub const JOB_SIGNALS: [Signal; 3] = [Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTSTP];

/// `JOB_SIGNALS` as a signal set
pub fn job_signals() -> SigSet {
    let mut set = SigSet::empty();
    for sig in JOB_SIGNALS {
        set.add(sig);
    }
    set
}

/// Blocks a set of signals until dropped, then restores the previous mask.
///
/// Guards nest: an inner guard saves the already-blocked mask and puts it back,
/// leaving the outer guard's blocking in place.
#[must_use = "signals are unblocked as soon as the guard is dropped"]
pub struct SignalGuard {
    previous: SigSet,
}

impl SignalGuard {
    /// Block `set` in addition to whatever is already blocked
    pub fn block(set: &SigSet) -> Result<Self> {
        let mut previous = SigSet::empty();
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(set), Some(&mut previous)).map_err(Error::Mask)?;
        Ok(SignalGuard { previous })
    }

    /// Block the job-control signals
    pub fn job_signals() -> Result<Self> {
        Self::block(&job_signals())
    }

    /// The mask that was in effect before this guard was taken.
    ///
    /// A freshly forked child restores this before exec, since the blocked
    /// mask is inherited across both fork and exec.
    pub fn previous(&self) -> &SigSet {
        &self.previous
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        // Only EINVAL is possible here, and SIG_SETMASK is always valid
        let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None);
    }
}

/// A wrapper type that allows an `UnsafeCell` to be shared with signal
/// handlers.
///
/// # Safety
/// The shell is single-threaded. Every access happens either inside
/// `with_jobs` (job signals blocked) or inside a relay handler (job signals
/// blocked by `sa_mask`), so two `&mut JobTable` never coexist.
#[repr(transparent)]
struct JobCell(UnsafeCell<JobTable>);

// SAFETY: see the type-level comment; access is serialized by the signal mask.
unsafe impl Sync for JobCell {}

// The cell is filled once at startup, before handlers are installed. After that
// `try_get` is a single atomic load and is safe to call from a handler.
static JOBS: OnceCell<JobCell> = OnceCell::uninit();

/// Allocate the global table with `capacity` slots.
///
/// Must run before [`crate::relay::install`]; a second call fails.
pub fn init(capacity: usize) -> Result<()> {
    JOBS.try_init_once(|| JobCell(UnsafeCell::new(JobTable::with_capacity(capacity))))
        .map_err(|_| Error::AlreadyInitialized)?;
    log::debug!("job table initialized with {} slots", capacity.max(1));
    Ok(())
}

/// Whether [`init`] has completed
pub fn is_initialized() -> bool {
    JOBS.is_initialized()
}

/// Run `f` on the global table with the job signals blocked.
///
/// Do not call `with_jobs` from inside `f`: the inner call would create a
/// second `&mut JobTable`.
pub fn with_jobs<R>(f: impl FnOnce(&mut JobTable) -> R) -> Result<R> {
    let _guard = SignalGuard::job_signals()?;
    let cell = JOBS.try_get().map_err(|_| Error::Uninitialized)?;
    // SAFETY: job signals are blocked and the shell is single-threaded, so
    // neither a handler nor another caller can hold a reference right now.
    let jobs = unsafe { &mut *cell.0.get() };
    Ok(f(jobs))
}

/// The global table, for use inside relay handlers only.
///
/// # Safety
/// The caller must be running inside a handler installed by
/// [`crate::relay::install`] (so every job signal is masked) and must not let
/// the reference escape the handler.
pub(crate) unsafe fn handler_jobs() -> Option<&'static mut JobTable> {
    match JOBS.try_get() {
        Ok(cell) => Some(&mut *cell.0.get()),
        Err(_) => None,
    }
}
