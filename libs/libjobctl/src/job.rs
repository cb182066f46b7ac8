//! Job Tracking - foreground, background and stopped job management
//!
//! `JobTable` is a plain data structure with no knowledge of signals. The
//! global instance and its masking discipline live in [`crate::table`].
//!
//! Jobs are stored by value with the command line in a fixed buffer, so the
//! SIGCHLD handler can insert, update and clear slots without ever touching
//! the allocator. The slot vector itself is allocated once, at startup.

use core::fmt;

use nix::unistd::Pid;

use crate::error::{Error, Result};
use crate::MAXLINE;

/// Run state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    /// Running and blocking the prompt
    Foreground = 0,
    /// Running without blocking the prompt
    Background = 1,
    /// Suspended until SIGCONT
    Stopped = 2,
}

impl JobState {
    /// Label shown by `jobs`
    pub fn label(self) -> &'static str {
        match self {
            JobState::Foreground | JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

/// A tracked child process
#[derive(Clone, Copy)]
pub struct Job {
    /// Process ID, also the job's process group ID
    pub pid: Pid,
    /// Job ID (1-based, shown to user as [1], [2], etc.)
    pub jid: u32,
    /// Current state of the job
    pub state: JobState,
    /// Command line stored as fixed-size buffer (no heap allocation)
    command: [u8; MAXLINE],
    /// Actual length of the command line
    command_len: usize,
}

impl Job {
    fn new(pid: Pid, jid: u32, state: JobState, command_line: &str) -> Self {
        let command_line = command_line.trim_end_matches(['\n', '\r']);

        // Truncate on a char boundary so command_line() stays valid UTF-8
        let mut len = command_line.len().min(MAXLINE);
        while !command_line.is_char_boundary(len) {
            len -= 1;
        }

        let mut command = [0u8; MAXLINE];
        command[..len].copy_from_slice(&command_line.as_bytes()[..len]);

        Job {
            pid,
            jid,
            state,
            command,
            command_len: len,
        }
    }

    /// The command line as typed, without the trailing newline
    pub fn command_line(&self) -> &str {
        core::str::from_utf8(&self.command[..self.command_len]).unwrap_or("")
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("pid", &self.pid)
            .field("jid", &self.jid)
            .field("state", &self.state)
            .field("command_line", &self.command_line())
            .finish()
    }
}

/// `jobs` listing line: `[jid] (pid) Running command_line`
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ({}) {} {}",
            self.jid,
            self.pid,
            self.state.label(),
            self.command_line()
        )
    }
}

/// Fixed-capacity job table
pub struct JobTable {
    /// Job slots (None = empty slot), never resized after construction
    slots: Vec<Option<Job>>,
}

impl JobTable {
    /// Create an empty table with `capacity` slots (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        JobTable {
            slots: vec![None; capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Highest jid currently in use, 0 when the table is empty
    pub fn max_jid(&self) -> u32 {
        self.iter().map(|job| job.jid).max().unwrap_or(0)
    }

    /// Register a job in the first free slot.
    ///
    /// The new jid is one past the highest jid still in use, so jids only grow
    /// while any job is alive and restart at 1 once the table drains.
    pub fn insert(&mut self, pid: Pid, state: JobState, command_line: &str) -> Result<u32> {
        if pid.as_raw() <= 0 {
            return Err(Error::InvalidPid(pid));
        }
        if self.lookup_by_pid(pid).is_some() {
            return Err(Error::DuplicatePid(pid));
        }
        if state == JobState::Foreground {
            if let Some(fg) = self.foreground_pid() {
                return Err(Error::ForegroundBusy(fg));
            }
        }

        let jid = self.max_jid() + 1;
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(Error::TableFull)?;
        *slot = Some(Job::new(pid, jid, state, command_line));
        Ok(jid)
    }

    /// Clear the slot holding `pid`. Returns whether a job was removed.
    pub fn remove(&mut self, pid: Pid) -> bool {
        for slot in &mut self.slots {
            if matches!(slot, Some(job) if job.pid == pid) {
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn lookup_by_pid(&self, pid: Pid) -> Option<&Job> {
        if pid.as_raw() <= 0 {
            return None;
        }
        self.iter().find(|job| job.pid == pid)
    }

    pub fn lookup_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        if pid.as_raw() <= 0 {
            return None;
        }
        self.iter_mut().find(|job| job.pid == pid)
    }

    pub fn lookup_by_jid(&self, jid: u32) -> Option<&Job> {
        if jid == 0 {
            return None;
        }
        self.iter().find(|job| job.jid == jid)
    }

    /// Update the state of a job by pid. Returns false if the pid is unknown.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> bool {
        match self.lookup_by_pid_mut(pid) {
            Some(job) => {
                job.state = state;
                true
            }
            None => false,
        }
    }

    /// Pid of the foreground job, if there is one
    pub fn foreground_pid(&self) -> Option<Pid> {
        self.iter()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    /// Jobs in slot order, for `jobs`
    pub fn list(&self) -> impl Iterator<Item = &Job> {
        self.iter()
    }

    fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut())
    }
}
