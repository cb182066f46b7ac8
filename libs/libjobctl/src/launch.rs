//! Process launcher
//!
//! Every external command runs in a fresh process group led by the child, so
//! the keyboard signals the relay forwards reach the job and anything it
//! spawned, and never the shell.

use std::ffi::CString;
use std::io::{self, Write};

use nix::sys::signal::{signal, sigprocmask, SigHandler, SigSet, SigmaskHow, Signal};
use nix::unistd::{execvp, fork, setpgid, ForkResult, Pid};

use crate::builtin::{self, Builtin};
use crate::error::{Error, Result};
use crate::job::JobState;
use crate::table::{self, with_jobs, SignalGuard};
use crate::wait::wait_for_foreground;
use crate::{signal_println, Flow, ShellConfig};

/// Outcome of one launched command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// A built-in ran in the shell
    Builtin(Flow),
    /// The job ran in the foreground and has since exited, been killed or stopped
    Foreground { jid: u32, pid: Pid },
    /// The job is running in the background
    Background { jid: u32, pid: Pid },
    /// The child runs but the table had no room for it
    Untracked { pid: Pid },
}

/// Run one parsed command line.
///
/// `command_line` is the line as typed; it is what `jobs` and the background
/// confirmation show.
pub fn launch(
    command_line: &str,
    argv: &[String],
    background: bool,
    config: &ShellConfig,
) -> Result<Launch> {
    let Some(program) = argv.first() else {
        return Ok(Launch::Builtin(Flow::Continue));
    };
    if let Some(builtin) = Builtin::from_name(program) {
        return builtin::run(builtin, argv, config).map(Launch::Builtin);
    }

    // Everything the child needs is allocated before fork
    let args = argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<core::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::NulArgument(program.clone()))?;
    let command_line = command_line.trim_end_matches(['\n', '\r']);
    let state = if background {
        JobState::Background
    } else {
        JobState::Foreground
    };

    // Held from before fork until the job is in the table, so the SIGCHLD
    // handler cannot reap the child before it has been registered.
    let guard = SignalGuard::job_signals()?;
    let _ = io::stdout().flush();

    // SAFETY: the shell is single-threaded, and the child only calls
    // async-signal-safe functions before exec or _exit.
    let child = match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => child,
        Ok(ForkResult::Child) => exec_child(program, &args, guard.previous()),
        Err(errno) => return Err(Error::Fork(errno)),
    };

    // Also done in the child; whichever runs first wins and the other fails
    // harmlessly (EACCES once the child has exec'd).
    let _ = setpgid(child, child);

    let jid = match with_jobs(|jobs| jobs.insert(child, state, command_line))? {
        Ok(jid) => jid,
        Err(err) => {
            log::debug!("pid {} runs untracked: {:?}", child, err);
            println!("{}", err);
            return Ok(Launch::Untracked { pid: child });
        }
    };
    log::debug!("forked pid {} as job [{}] ({:?})", child, jid, state);

    if background {
        println!("[{}] {} {}", jid, child, command_line);
        drop(guard);
        return Ok(Launch::Background { jid, pid: child });
    }

    drop(guard);
    wait_for_foreground(child, config.poll_interval)?;
    Ok(Launch::Foreground { jid, pid: child })
}

/// Child side of fork: move into a new process group, undo the shell's
/// signal setup and exec. Never returns.
fn exec_child(program: &str, args: &[CString], mask: &SigSet) -> ! {
    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));

    // Pending job signals are delivered once unmasked, and must not run the
    // shell's relay handlers against the child's copy of the table.
    for sig in table::JOB_SIGNALS {
        // SAFETY: SIG_DFL installs no handler code.
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
    // The Rust runtime ignores SIGPIPE, and an ignored disposition survives exec
    // SAFETY: as above.
    let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };
    let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(mask), None);

    // execvp only returns on failure
    let _ = execvp(&args[0], args);
    signal_println!("{}: Command not found", program);

    // SAFETY: _exit skips atexit handlers and stdio buffers inherited from
    // the shell.
    unsafe { libc::_exit(127) }
}

#[cfg(test)]
mod tests {
    use super::*;

    // External launches need the global table; they are covered by the
    // integration tests that drive the shell binary.

    #[test]
    fn empty_argv_is_a_no_op() {
        let launched = launch("", &[], false, &ShellConfig::default()).unwrap();
        assert_eq!(launched, Launch::Builtin(Flow::Continue));
    }

    #[test]
    fn builtins_do_not_fork() {
        let argv = vec!["quit".to_string()];
        let launched = launch("quit\n", &argv, false, &ShellConfig::default()).unwrap();
        assert_eq!(launched, Launch::Builtin(Flow::Quit));
    }

    #[test]
    fn nul_in_argument_is_rejected_before_fork() {
        let argv = vec!["/bin/echo".to_string(), "a\0b".to_string()];
        let err = launch("/bin/echo", &argv, true, &ShellConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "/bin/echo: argument contains a NUL byte");
    }
}
