//! Signal delivery
//!
//! Job-control signals always go to a whole process group so a job and any
//! children it spawned stop, continue or die together. The target is spelled
//! out as an enum instead of the classic negative-pid encoding.

use core::fmt;

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

use crate::error::{Error, Result};

/// Where a signal is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTarget {
    /// A single process
    Process(Pid),
    /// Every process in the group led by this pid
    Group(Pid),
}

impl SignalTarget {
    /// The group a job leads. Jobs are launched with `setpgid(0, 0)`, so the
    /// job's pid is also its process group id.
    pub fn job(pid: Pid) -> Self {
        SignalTarget::Group(pid)
    }
}

impl fmt::Display for SignalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalTarget::Process(pid) => write!(f, "pid {}", pid),
            SignalTarget::Group(pid) => write!(f, "pgrp {}", pid),
        }
    }
}

/// Send `sig` to `target`.
///
/// Async-signal-safe: this is a single kill(2)/killpg(2) call and is used
/// from the relay's handlers as well as from `bg`/`fg`.
pub fn send(target: SignalTarget, sig: Signal) -> Result<()> {
    let res = match target {
        SignalTarget::Process(pid) => kill(pid, sig),
        SignalTarget::Group(pgrp) => killpg(pgrp, sig),
    };
    res.map_err(|errno| Error::Signal { target, errno })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn job_targets_its_group() {
        let pid = Pid::from_raw(4242);
        assert_eq!(SignalTarget::job(pid), SignalTarget::Group(pid));
    }

    #[test]
    fn display_names_the_addressing_mode() {
        assert_eq!(SignalTarget::Group(Pid::from_raw(7)).to_string(), "pgrp 7");
        assert_eq!(SignalTarget::Process(Pid::from_raw(7)).to_string(), "pid 7");
    }

    #[test]
    fn vanished_group_reports_esrch() {
        // A reaped child's pid names no process and no group.
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        child.wait().unwrap();

        let target = SignalTarget::Group(pid);
        match send(target, Signal::SIGCONT) {
            Err(Error::Signal { target: t, errno }) => {
                assert_eq!(t, target);
                assert_eq!(errno, Errno::ESRCH);
            }
            other => panic!("expected ESRCH, got {:?}", other),
        }
    }
}
