//! Built-in commands: quit, jobs, bg, fg and the lone `&`
//!
//! Built-ins run synchronously in the shell process; nothing is forked.

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::error::{Error, Result};
use crate::job::{Job, JobState, JobTable};
use crate::signal::{self, SignalTarget};
use crate::table::with_jobs;
use crate::wait::wait_for_foreground;
use crate::{Flow, ShellConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Exit the shell
    Quit,
    /// List the job table
    Jobs,
    /// Resume a job in the background
    Bg,
    /// Resume a job in the foreground and wait for it
    Fg,
    /// A stray `&` with no command
    Ignore,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quit" => Some(Builtin::Quit),
            "jobs" => Some(Builtin::Jobs),
            "bg" => Some(Builtin::Bg),
            "fg" => Some(Builtin::Fg),
            "&" => Some(Builtin::Ignore),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Quit => "quit",
            Builtin::Jobs => "jobs",
            Builtin::Bg => "bg",
            Builtin::Fg => "fg",
            Builtin::Ignore => "&",
        }
    }
}

/// A `bg`/`fg` argument: `1234` names a pid, `%2` names a jid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRef {
    Pid(i32),
    /// `typed` is the argument as entered, echoed back in "No such job"
    Jid { jid: u32, typed: String },
}

impl JobRef {
    /// Parse the argument of the `cmd` built-in
    pub fn parse(cmd: &'static str, arg: Option<&str>) -> Result<Self> {
        let arg = arg.ok_or(Error::MissingJobArg(cmd))?;

        if arg.starts_with(|c: char| c.is_ascii_digit()) {
            let pid = arg.parse::<i32>().map_err(|_| Error::BadJobArg(cmd))?;
            Ok(JobRef::Pid(pid))
        } else if let Some(digits) = arg.strip_prefix('%') {
            // Unparsable jids resolve as jid 0, which is never assigned
            let jid = digits.parse::<u32>().unwrap_or(0);
            Ok(JobRef::Jid {
                jid,
                typed: arg.to_string(),
            })
        } else {
            Err(Error::BadJobArg(cmd))
        }
    }

    /// Find the referenced job
    pub fn resolve<'a>(&self, jobs: &'a JobTable) -> Result<&'a Job> {
        match self {
            JobRef::Pid(pid) => jobs
                .lookup_by_pid(Pid::from_raw(*pid))
                .ok_or(Error::NoSuchProcess(*pid)),
            JobRef::Jid { jid, typed } => jobs
                .lookup_by_jid(*jid)
                .ok_or_else(|| Error::NoSuchJob(typed.clone())),
        }
    }
}

/// Run a built-in. `argv[0]` is the built-in's own name.
pub fn run(builtin: Builtin, argv: &[String], config: &ShellConfig) -> Result<Flow> {
    match builtin {
        Builtin::Quit => return Ok(Flow::Quit),
        Builtin::Jobs => list_jobs()?,
        Builtin::Bg | Builtin::Fg => resume(builtin, argv, config)?,
        Builtin::Ignore => {}
    }
    Ok(Flow::Continue)
}

/// Print every tracked job, in slot order
fn list_jobs() -> Result<()> {
    with_jobs(|jobs| {
        for job in jobs.list() {
            println!("{}", job);
        }
    })
}

/// `bg` / `fg`: continue the job's process group and move it to the requested
/// state. `fg` then blocks until the job leaves the foreground.
fn resume(builtin: Builtin, argv: &[String], config: &ShellConfig) -> Result<()> {
    let job_ref = JobRef::parse(builtin.name(), argv.get(1).map(String::as_str))?;
    let state = match builtin {
        Builtin::Fg => JobState::Foreground,
        _ => JobState::Background,
    };

    // Lookup, SIGCONT and the state change form one unit with respect to the
    // relay. If the group has already vanished the state is left alone; the
    // SIGCHLD handler will remove the job.
    let job = with_jobs(|jobs| -> Result<Job> {
        let job = *job_ref.resolve(jobs)?;
        signal::send(SignalTarget::job(job.pid), Signal::SIGCONT)?;
        jobs.set_state(job.pid, state);
        Ok(job)
    })??;
    log::debug!("{} resumed job [{}] ({}) as {:?}", builtin.name(), job.jid, job.pid, state);

    match builtin {
        Builtin::Fg => wait_for_foreground(job.pid, config.poll_interval)?,
        _ => println!("[{}] ({}) {}", job.jid, job.pid, job.command_line()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_builtin_names() {
        assert_eq!(Builtin::from_name("quit"), Some(Builtin::Quit));
        assert_eq!(Builtin::from_name("jobs"), Some(Builtin::Jobs));
        assert_eq!(Builtin::from_name("bg"), Some(Builtin::Bg));
        assert_eq!(Builtin::from_name("fg"), Some(Builtin::Fg));
        assert_eq!(Builtin::from_name("&"), Some(Builtin::Ignore));
        assert_eq!(Builtin::from_name("/bin/ls"), None);
        assert_eq!(Builtin::from_name("Quit"), None);
    }

    #[test]
    fn names_round_trip() {
        for b in [Builtin::Quit, Builtin::Jobs, Builtin::Bg, Builtin::Fg, Builtin::Ignore] {
            assert_eq!(Builtin::from_name(b.name()), Some(b));
        }
    }

    #[test]
    fn parses_pid_and_jid_arguments() {
        assert_eq!(JobRef::parse("bg", Some("1234")).unwrap(), JobRef::Pid(1234));
        assert_eq!(
            JobRef::parse("fg", Some("%2")).unwrap(),
            JobRef::Jid {
                jid: 2,
                typed: "%2".into()
            }
        );
    }

    #[test]
    fn missing_argument_is_usage_error() {
        let err = JobRef::parse("fg", None).unwrap_err();
        assert_eq!(err.to_string(), "fg command requires PID or %jobid argument");
    }

    #[test]
    fn malformed_arguments_are_usage_errors() {
        for arg in ["abc", "-5", "12abc", ""] {
            let err = JobRef::parse("bg", Some(arg)).unwrap_err();
            assert_eq!(err.to_string(), "bg: argument must be a PID or %jobid", "arg {:?}", arg);
        }
    }

    #[test]
    fn unparsable_jid_never_resolves() {
        let job_ref = JobRef::parse("fg", Some("%abc")).unwrap();
        let mut jobs = JobTable::with_capacity(2);
        jobs.insert(Pid::from_raw(100), JobState::Background, "a &").unwrap();

        let err = job_ref.resolve(&jobs).unwrap_err();
        assert_eq!(err.to_string(), "%abc: No such job");
    }

    #[test]
    fn resolves_against_table() {
        let mut jobs = JobTable::with_capacity(4);
        jobs.insert(Pid::from_raw(100), JobState::Background, "a &").unwrap();
        jobs.insert(Pid::from_raw(101), JobState::Stopped, "b").unwrap();

        let by_pid = JobRef::Pid(101).resolve(&jobs).unwrap();
        assert_eq!(by_pid.jid, 2);

        let by_jid = JobRef::parse("fg", Some("%1")).unwrap();
        assert_eq!(by_jid.resolve(&jobs).unwrap().pid, Pid::from_raw(100));
    }

    #[test]
    fn unresolved_references_report_as_typed() {
        let jobs = JobTable::with_capacity(4);
        assert_eq!(
            JobRef::Pid(999999).resolve(&jobs).unwrap_err().to_string(),
            "(999999): No such process"
        );
        let job_ref = JobRef::parse("bg", Some("%3")).unwrap();
        assert_eq!(job_ref.resolve(&jobs).unwrap_err().to_string(), "%3: No such job");
    }

    #[test]
    fn quit_and_ignore_need_no_table() {
        let config = ShellConfig::default();
        let quit = run(Builtin::Quit, &["quit".into()], &config).unwrap();
        assert_eq!(quit, Flow::Quit);
        let amp = run(Builtin::Ignore, &["&".into()], &config).unwrap();
        assert_eq!(amp, Flow::Continue);
    }

    #[test]
    fn bg_without_argument_fails_before_touching_table() {
        let config = ShellConfig::default();
        let err = run(Builtin::Bg, &["bg".into()], &config).unwrap_err();
        assert!(matches!(err, Error::MissingJobArg("bg")));
    }
}
