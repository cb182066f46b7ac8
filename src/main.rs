//! jcsh: read a line, run it, repeat.
//!
//! Usage: jcsh [-v] [-p] [--max-jobs N] [--poll-ms MS] [--prompt TEXT]

mod cli;
mod logger;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use jobctl::{eval, relay, signal_println, table, Flow};
use nix::sys::signal::Signal;
use nix::unistd::dup2;

use crate::cli::Cli;

/// SIGQUIT ends the shell; used by drivers to stop a wedged session.
extern "C" fn sigquit_handler(_sig: libc::c_int) {
    signal_println!("Terminating after receipt of SIGQUIT signal");
    // SAFETY: _exit is async-signal-safe.
    unsafe { libc::_exit(1) }
}

fn main() -> Result<()> {
    let (config, front) = Cli::parse().into_config();

    // Diagnostics share stdout so a driver sees one ordered stream
    dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO).context("dup2 stdout onto stderr")?;
    logger::init(front.log_level);

    table::init(config.max_jobs).context("initialize job table")?;
    relay::install().context("install job signal handlers")?;
    relay::install_handler(Signal::SIGQUIT, sigquit_handler).context("install SIGQUIT handler")?;
    log::debug!("jcsh ready: {:?}", config);

    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let mut line = Vec::new();
    loop {
        if let Some(prompt) = &front.prompt {
            print!("{}", prompt);
        }
        io::stdout().flush().context("flush stdout")?;

        line.clear();
        let read = stdin.read_until(b'\n', &mut line).context("read stdin")?;
        if read == 0 {
            log::debug!("end of input");
            break;
        }

        let text = String::from_utf8_lossy(&line);
        if eval::eval(&text, &config) == Flow::Quit {
            break;
        }
    }

    io::stdout().flush().context("flush stdout")?;
    Ok(())
}
