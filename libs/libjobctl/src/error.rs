//! Unified error type for job control operations.
//!
//! Every fallible function in this crate returns `Result<T, Error>`. The
//! `Display` text of each variant is exactly what the shell prints, so callers
//! report user errors with a plain `println!("{}", err)`.

use nix::errno::Errno;
use nix::unistd::Pid;

use crate::signal::SignalTarget;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `bg`/`fg` typed without an argument
    #[error("{0} command requires PID or %jobid argument")]
    MissingJobArg(&'static str),

    /// `bg`/`fg` argument is neither a pid nor `%jid`
    #[error("{0}: argument must be a PID or %jobid")]
    BadJobArg(&'static str),

    /// Numeric argument does not match any tracked pid
    #[error("({0}): No such process")]
    NoSuchProcess(i32),

    /// `%jid` argument does not match any tracked job; holds the text as typed
    #[error("{0}: No such job")]
    NoSuchJob(String),

    /// Every job slot is occupied
    #[error("Tried to create too many jobs")]
    TableFull,

    /// Pid already tracked
    #[error("job table already tracks pid {0}")]
    DuplicatePid(Pid),

    /// Pid zero or negative
    #[error("invalid pid {0}")]
    InvalidPid(Pid),

    /// A second foreground job was registered while one is still active
    #[error("pid {0} is already the foreground job")]
    ForegroundBusy(Pid),

    /// An argument cannot be passed to exec
    #[error("{0}: argument contains a NUL byte")]
    NulArgument(String),

    /// fork(2) failed
    #[error("fork error: {0}")]
    Fork(Errno),

    /// Signal delivery failed, usually because the group already exited
    #[error("kill ({target}): {errno}")]
    Signal { target: SignalTarget, errno: Errno },

    /// sigprocmask(2) failed
    #[error("sigprocmask error: {0}")]
    Mask(Errno),

    /// sigaction(2) failed
    #[error("sigaction error: {0}")]
    Install(Errno),

    /// `table::with_jobs` called before `table::init`
    #[error("job table not initialized")]
    Uninitialized,

    /// `table::init` called twice
    #[error("job table already initialized")]
    AlreadyInitialized,
}

impl Error {
    /// True for errors caused by what the user typed, as opposed to the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::MissingJobArg(_)
                | Error::BadJobArg(_)
                | Error::NoSuchProcess(_)
                | Error::NoSuchJob(_)
                | Error::NulArgument(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_match_shell_output() {
        assert_eq!(
            Error::MissingJobArg("fg").to_string(),
            "fg command requires PID or %jobid argument"
        );
        assert_eq!(
            Error::BadJobArg("bg").to_string(),
            "bg: argument must be a PID or %jobid"
        );
        assert_eq!(
            Error::NoSuchProcess(999999).to_string(),
            "(999999): No such process"
        );
        assert_eq!(Error::NoSuchJob("%7".into()).to_string(), "%7: No such job");
        assert_eq!(Error::TableFull.to_string(), "Tried to create too many jobs");
    }

    #[test]
    fn classifies_user_errors() {
        assert!(Error::NoSuchJob("%1".into()).is_user_error());
        assert!(!Error::TableFull.is_user_error());
        assert!(!Error::Fork(Errno::EAGAIN).is_user_error());
    }
}
