//! Job control core for the jcsh shell
//!
//! This library owns everything between "a line was typed" and "the child
//! changed state":
//!
//! - [`job`] / [`table`]: the fixed-capacity job table and the signal-mask
//!   discipline that guards the single global instance
//! - [`launch`]: fork + exec of external programs in their own process group
//! - [`builtin`]: `quit`, `jobs`, `bg`, `fg` and the lone `&`
//! - [`relay`]: SIGCHLD / SIGINT / SIGTSTP handlers
//! - [`wait`]: the foreground waiter
//! - [`eval`]: glue that runs one command line
//!
//! # Signal safety
//!
//! The table is shared between the main flow and the handlers in [`relay`].
//! Handlers never allocate, lock or log. The main flow only touches the table
//! through [`table::with_jobs`], which blocks the three job-control signals
//! for the duration of the closure, so a handler sees the table either before
//! or after a main-flow update and never in the middle of one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobctl::{eval, relay, table, Flow, ShellConfig};
//!
//! let config = ShellConfig::default();
//! table::init(config.max_jobs)?;
//! relay::install()?;
//!
//! if eval::eval("/bin/sleep 1 &", &config) == Flow::Quit {
//!     return Ok(());
//! }
//! ```

pub use error::{Error, Result};
pub use job::{Job, JobState};
pub use signal::SignalTarget;

pub mod builtin;
pub mod console;
pub mod error;
pub mod eval;
pub mod job;
pub mod launch;
pub mod parse;
pub mod relay;
pub mod signal;
pub mod table;
pub mod wait;

use std::time::Duration;

/// Maximum length of a stored command line (bytes)
pub const MAXLINE: usize = 1024;

/// Maximum number of arguments kept from one command line
pub const MAXARGS: usize = 128;

/// Default job table capacity
pub const MAXJOBS: usize = 16;

/// Default foreground waiter poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What the read-eval loop should do after a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Print the prompt and read the next line
    Continue,
    /// `quit` was typed
    Quit,
}

/// Settings the core needs at runtime
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Number of job table slots, fixed for the life of the shell
    pub max_jobs: usize,
    /// How long the foreground waiter sleeps between table checks
    pub poll_interval: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            max_jobs: MAXJOBS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
