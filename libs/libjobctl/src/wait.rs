//! Foreground waiter
//!
//! The shell does not call waitpid for its foreground job. The SIGCHLD handler
//! is the only reaper, so waiting here just means watching the table until the
//! handler has moved `pid` out of the foreground (stopped) or out of the table
//! (exited or killed).

use std::thread;
use std::time::Duration;

use nix::unistd::Pid;

use crate::error::Result;
use crate::table::with_jobs;

/// Block until `pid` is no longer the foreground job.
///
/// The table is checked with signals masked and the sleep happens with them
/// unmasked, so the handler can run between checks.
pub fn wait_for_foreground(pid: Pid, interval: Duration) -> Result<()> {
    log::trace!("waiting for foreground pid {}", pid);
    while with_jobs(|jobs| jobs.foreground_pid())? == Some(pid) {
        thread::sleep(interval);
    }
    log::trace!("pid {} left the foreground", pid);
    Ok(())
}
