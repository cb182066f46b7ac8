//! jcsh trace runner
//!
//! Drives the shell binary from host-side integration tests. A trace is a
//! script with one shell input line per line, plus driver directives:
//!
//! - `SLEEP <ms>`: pause the driver
//! - `INT`, `TSTP`, `QUIT`: send that signal to the shell process
//! - `WAIT`: wait for the shell to exit
//! - `CLOSE`: close the shell's stdin
//! - `# ...`: comment
//!
//! Anything else is written to the shell's stdin.

use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// How long a run may take before the driver gives up and kills the shell
pub const RUN_TIMEOUT: Duration = Duration::from_secs(20);

/// Foreground poll interval passed to the shell unless the caller overrides it
pub const POLL_MS: &str = "10";

/// Constants for common output lines
pub mod markers {
    pub const SIGINT_KILL: &str = "terminated by signal 2";
    pub const SIGTSTP_STOP: &str = "stopped by signal 20";
    pub const SIGQUIT_EXIT: &str = "Terminating after receipt of SIGQUIT signal";
    pub const TABLE_FULL: &str = "Tried to create too many jobs";
}

/// One step of a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Input(String),
    Sleep(Duration),
    Signal(Signal),
    Wait,
    Close,
}

/// Parse a trace script into steps
pub fn parse_trace(trace: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (number, line) in trace.lines().enumerate() {
        let trimmed = line.trim();
        let mut words = trimmed.split_whitespace();
        let step = match words.next() {
            None => continue,
            Some(word) if word.starts_with('#') => continue,
            Some("SLEEP") => {
                let ms = words
                    .next()
                    .with_context(|| format!("line {}: SLEEP needs milliseconds", number + 1))?
                    .parse::<u64>()
                    .with_context(|| format!("line {}: bad SLEEP duration", number + 1))?;
                Step::Sleep(Duration::from_millis(ms))
            }
            Some("INT") => Step::Signal(Signal::SIGINT),
            Some("TSTP") => Step::Signal(Signal::SIGTSTP),
            Some("QUIT") => Step::Signal(Signal::SIGQUIT),
            Some("WAIT") => Step::Wait,
            Some("CLOSE") => Step::Close,
            Some(_) => Step::Input(trimmed.to_string()),
        };
        steps.push(step);
    }
    Ok(steps)
}

/// Result of a shell run, containing output and helper methods
pub struct ShellRun {
    pub output: Output,
}

impl ShellRun {
    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn status(&self) -> ExitStatus {
        self.output.status
    }

    /// Output lines
    pub fn lines(&self) -> Vec<String> {
        self.stdout_str().lines().map(str::to_owned).collect()
    }

    /// Assert that `needle` appears in the shell output
    pub fn assert_contains(&self, needle: &str) {
        let stdout = self.stdout_str();
        assert!(
            stdout.contains(needle),
            "'{}' not found in shell output:\n{}",
            needle,
            stdout
        );
    }

    /// Count occurrences of a pattern in the output
    pub fn count_pattern(&self, pattern: &str) -> usize {
        self.stdout_str().matches(pattern).count()
    }

    /// Assert that a pattern appears exactly N times
    pub fn assert_count(&self, pattern: &str, expected: usize) {
        let actual = self.count_pattern(pattern);
        assert_eq!(
            actual,
            expected,
            "expected {} occurrences of '{}', found {} in:\n{}",
            expected,
            pattern,
            actual,
            self.stdout_str()
        );
    }
}

fn send_input(stdin: &mut Option<ChildStdin>, line: &str) -> Result<()> {
    let Some(pipe) = stdin.as_mut() else {
        bail!("input {:?} after CLOSE", line);
    };
    writeln!(pipe, "{}", line).context("write to shell stdin")?;
    pipe.flush().context("flush shell stdin")?;
    Ok(())
}

/// Poll until the shell exits, killing it after `RUN_TIMEOUT`
fn wait_for_exit(child: &mut Child, started: Instant) -> Result<()> {
    loop {
        if child.try_wait().context("poll shell")?.is_some() {
            return Ok(());
        }
        if started.elapsed() > RUN_TIMEOUT {
            let _ = child.kill();
            bail!("shell did not exit within {:?}", RUN_TIMEOUT);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Run the shell at `binary` against `trace`.
///
/// The shell is started with `-p --poll-ms 10` followed by `extra_args`. When
/// the trace ends, stdin is closed and the driver waits for the shell to exit.
pub fn run_trace(binary: impl AsRef<Path>, trace: &str, extra_args: &[&str]) -> Result<ShellRun> {
    let steps = parse_trace(trace)?;
    let binary = binary.as_ref();

    let mut child = Command::new(binary)
        .args(["-p", "--poll-ms", POLL_MS])
        .args(extra_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", binary.display()))?;
    let shell = Pid::from_raw(child.id() as i32);
    let started = Instant::now();
    let mut stdin = child.stdin.take();

    for step in steps {
        match step {
            Step::Input(line) => send_input(&mut stdin, &line)?,
            Step::Sleep(duration) => thread::sleep(duration),
            Step::Signal(sig) => {
                kill(shell, sig).with_context(|| format!("send {} to shell", sig))?
            }
            Step::Wait => wait_for_exit(&mut child, started)?,
            Step::Close => drop(stdin.take()),
        }
    }

    drop(stdin);
    wait_for_exit(&mut child, started)?;
    let output = child
        .wait_with_output()
        .context("collect shell output")?;
    Ok(ShellRun { output })
}
