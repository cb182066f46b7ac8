//! Signal relay: SIGCHLD, SIGINT and SIGTSTP handlers
//!
//! - SIGCHLD reaps every child with a reportable state change and applies it
//!   to the job table (remove on exit or kill, mark Stopped on stop).
//! - SIGINT and SIGTSTP are forwarded to the foreground job's process group.
//!   The shell itself is never interrupted or stopped by the keyboard.
//!
//! All three run with every job signal masked (see [`crate::table`]) and use
//! only async-signal-safe calls: waitpid, kill and write. Nothing here
//! allocates, locks or logs.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::error::{Error, Result};
use crate::job::{JobState, JobTable};
use crate::signal::{self, SignalTarget};
use crate::{signal_println, table};

/// Number of relay handlers currently executing on this process
static HANDLER_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// True while a relay handler is running.
///
/// Code that is not async-signal-safe (the logger in particular) checks this
/// and backs off.
pub fn in_handler() -> bool {
    HANDLER_DEPTH.load(Ordering::SeqCst) > 0
}

/// Marks handler entry and restores `errno` on exit, so the interrupted main
/// flow never sees an errno left behind by waitpid or kill.
struct HandlerScope {
    saved_errno: i32,
}

impl HandlerScope {
    fn enter() -> Self {
        HANDLER_DEPTH.fetch_add(1, Ordering::SeqCst);
        HandlerScope {
            saved_errno: Errno::last_raw(),
        }
    }
}

impl Drop for HandlerScope {
    fn drop(&mut self) {
        Errno::set_raw(self.saved_errno);
        HANDLER_DEPTH.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A state change worth telling the user about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Terminated { jid: u32, pid: Pid, signal: Signal },
    Stopped { jid: u32, pid: Pid, signal: Signal },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Notice::Terminated { jid, pid, signal } => write!(
                f,
                "Job [{}] ({}) terminated by signal {}",
                jid, pid, signal as i32
            ),
            Notice::Stopped { jid, pid, signal } => write!(
                f,
                "Job [{}] ({}) stopped by signal {}",
                jid, pid, signal as i32
            ),
        }
    }
}

/// Apply one reaped child status to the table.
///
/// Killed jobs are removed and reported, stopped jobs are marked Stopped and
/// reported, exited jobs are removed silently. Statuses for pids the table
/// does not track (the table was full at launch) change nothing.
pub fn apply_status(jobs: &mut JobTable, status: WaitStatus) -> Option<Notice> {
    match status {
        WaitStatus::Signaled(pid, signal, _core_dumped) => {
            let jid = jobs.lookup_by_pid(pid)?.jid;
            jobs.remove(pid);
            Some(Notice::Terminated { jid, pid, signal })
        }
        WaitStatus::Stopped(pid, signal) => {
            let job = jobs.lookup_by_pid_mut(pid)?;
            job.state = JobState::Stopped;
            Some(Notice::Stopped {
                jid: job.jid,
                pid,
                signal,
            })
        }
        WaitStatus::Exited(pid, _code) => {
            jobs.remove(pid);
            None
        }
        _ => None,
    }
}

/// Reap every child with a pending state change without blocking.
///
/// Signals do not queue, so one SIGCHLD may stand for several children, or
/// for none if an earlier pass already reaped them.
fn reap_children(jobs: &mut JobTable) {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED;
    loop {
        match waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(notice) = apply_status(jobs, status) {
                    signal_println!("{}", notice);
                }
            }
            Err(Errno::EINTR) => continue,
            // ECHILD: nothing left to reap
            Err(_) => break,
        }
    }
}

/// Forward `sig` to the foreground job's process group.
///
/// Returns the pid that was signalled, or `None` when nothing is in the
/// foreground.
pub fn forward_to_foreground(jobs: &JobTable, sig: Signal) -> Result<Option<Pid>> {
    let Some(pid) = jobs.foreground_pid() else {
        return Ok(None);
    };
    signal::send(SignalTarget::job(pid), sig)?;
    Ok(Some(pid))
}

extern "C" fn sigchld_handler(_sig: libc::c_int) {
    let _scope = HandlerScope::enter();
    // SAFETY: installed by `install`, so every job signal is masked here.
    if let Some(jobs) = unsafe { table::handler_jobs() } {
        reap_children(jobs);
    }
}

fn relay_keyboard_signal(sig: Signal) {
    let _scope = HandlerScope::enter();
    // SAFETY: installed by `install`, so every job signal is masked here.
    let Some(jobs) = (unsafe { table::handler_jobs() }) else {
        return;
    };
    if let Err(err) = forward_to_foreground(jobs, sig) {
        signal_println!("{}", err);
    }
}

extern "C" fn sigint_handler(_sig: libc::c_int) {
    relay_keyboard_signal(Signal::SIGINT);
}

extern "C" fn sigtstp_handler(_sig: libc::c_int) {
    relay_keyboard_signal(Signal::SIGTSTP);
}

/// Install `handler` for `sig` with the job signals masked while it runs.
///
/// Handlers are installed with SA_RESTART so a notification arriving while
/// the main flow reads stdin does not surface as an interrupted read.
pub fn install_handler(sig: Signal, handler: extern "C" fn(libc::c_int)) -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handler),
        SaFlags::SA_RESTART,
        table::job_signals(),
    );
    // SAFETY: every handler passed here is restricted to async-signal-safe
    // operations.
    unsafe { sigaction(sig, &action) }.map_err(Error::Install)?;
    Ok(())
}

/// Install the SIGCHLD, SIGINT and SIGTSTP handlers.
///
/// Fails with [`Error::Uninitialized`] unless [`table::init`] has run.
pub fn install() -> Result<()> {
    if !table::is_initialized() {
        return Err(Error::Uninitialized);
    }
    install_handler(Signal::SIGCHLD, sigchld_handler)?;
    install_handler(Signal::SIGINT, sigint_handler)?;
    install_handler(Signal::SIGTSTP, sigtstp_handler)?;
    log::debug!("signal relay installed for SIGCHLD, SIGINT, SIGTSTP");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::{CommandExt, ExitStatusExt};
    use std::process::Command;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    fn table_with_foreground(raw: i32) -> JobTable {
        let mut jobs = JobTable::with_capacity(4);
        jobs.insert(pid(raw), JobState::Foreground, "/bin/sleep 5").unwrap();
        jobs
    }

    #[test]
    fn killed_job_is_removed_and_reported() {
        let mut jobs = table_with_foreground(500);
        let notice = apply_status(&mut jobs, WaitStatus::Signaled(pid(500), Signal::SIGINT, false));

        assert_eq!(
            notice,
            Some(Notice::Terminated {
                jid: 1,
                pid: pid(500),
                signal: Signal::SIGINT
            })
        );
        assert!(jobs.lookup_by_pid(pid(500)).is_none());
        assert_eq!(jobs.foreground_pid(), None);
    }

    #[test]
    fn stopped_job_stays_in_table() {
        let mut jobs = table_with_foreground(500);
        let notice = apply_status(&mut jobs, WaitStatus::Stopped(pid(500), Signal::SIGTSTP));

        assert!(matches!(notice, Some(Notice::Stopped { jid: 1, .. })));
        let job = jobs.lookup_by_pid(pid(500)).unwrap();
        assert_eq!(job.state, JobState::Stopped);
        assert_eq!(jobs.foreground_pid(), None);
    }

    #[test]
    fn exited_job_is_removed_silently() {
        let mut jobs = table_with_foreground(500);
        jobs.insert(pid(501), JobState::Background, "/bin/true &").unwrap();

        assert_eq!(apply_status(&mut jobs, WaitStatus::Exited(pid(501), 0)), None);
        assert!(jobs.lookup_by_pid(pid(501)).is_none());
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn untracked_children_change_nothing() {
        let mut jobs = table_with_foreground(500);
        assert_eq!(
            apply_status(&mut jobs, WaitStatus::Signaled(pid(900), Signal::SIGKILL, false)),
            None
        );
        assert_eq!(
            apply_status(&mut jobs, WaitStatus::Stopped(pid(900), Signal::SIGSTOP)),
            None
        );
        assert_eq!(apply_status(&mut jobs, WaitStatus::Exited(pid(900), 1)), None);
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn continued_status_is_ignored() {
        let mut jobs = table_with_foreground(500);
        jobs.set_state(pid(500), JobState::Stopped);
        assert_eq!(apply_status(&mut jobs, WaitStatus::Continued(pid(500))), None);
        assert_eq!(jobs.lookup_by_pid(pid(500)).unwrap().state, JobState::Stopped);
    }

    #[test]
    fn notice_text() {
        let term = Notice::Terminated {
            jid: 1,
            pid: pid(4242),
            signal: Signal::SIGINT,
        };
        let stop = Notice::Stopped {
            jid: 2,
            pid: pid(4243),
            signal: Signal::SIGTSTP,
        };
        assert_eq!(term.to_string(), "Job [1] (4242) terminated by signal 2");
        assert_eq!(stop.to_string(), "Job [2] (4243) stopped by signal 20");
    }

    #[test]
    fn nothing_to_forward_without_foreground_job() {
        let mut jobs = JobTable::with_capacity(2);
        assert_eq!(forward_to_foreground(&jobs, Signal::SIGINT).unwrap(), None);

        jobs.insert(pid(500), JobState::Background, "bg &").unwrap();
        assert_eq!(forward_to_foreground(&jobs, Signal::SIGINT).unwrap(), None);
    }

    #[test]
    fn forwards_to_foreground_group() {
        let mut child = Command::new("sleep").arg("5").process_group(0).spawn().unwrap();
        let child_pid = pid(child.id() as i32);

        let mut jobs = JobTable::with_capacity(2);
        jobs.insert(child_pid, JobState::Foreground, "sleep 5").unwrap();

        assert_eq!(
            forward_to_foreground(&jobs, Signal::SIGINT).unwrap(),
            Some(child_pid)
        );
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGINT as i32));
    }

    // The only test that touches the handler depth counter.
    #[test]
    fn handler_scope_tracks_depth_and_restores_errno() {
        assert!(!in_handler());
        Errno::set_raw(libc::EAGAIN);
        {
            let _scope = HandlerScope::enter();
            assert!(in_handler());
            Errno::set_raw(libc::ECHILD);
        }
        assert_eq!(Errno::last_raw(), libc::EAGAIN);
        assert!(!in_handler());
    }
}
