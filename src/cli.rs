use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::Parser;
use jobctl::ShellConfig;
use log::LevelFilter;

/// jcsh - a small job-control shell
#[derive(Parser, Debug)]
#[command(name = "jcsh")]
#[command(version)]
#[command(about = "A small job-control shell", long_about = None)]
pub struct Cli {
    /// Emit debug logging (-v) or trace logging (-vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Do not print a prompt (for scripted input)
    #[arg(short = 'p', long = "no-prompt")]
    pub no_prompt: bool,

    /// Number of job table slots
    #[arg(
        long = "max-jobs",
        default_value_t = jobctl::MAXJOBS,
        value_parser = clap::value_parser!(u64).range(1..=1024).map(|n| n as usize)
    )]
    pub max_jobs: usize,

    /// Foreground wait poll interval in milliseconds
    #[arg(
        long = "poll-ms",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_ms: u64,

    /// Prompt text
    #[arg(long = "prompt", default_value = "jcsh> ")]
    pub prompt: String,
}

/// Front-end settings that the job-control core does not see
#[derive(Debug, Clone)]
pub struct FrontEnd {
    /// `None` when prompting is disabled
    pub prompt: Option<String>,
    pub log_level: LevelFilter,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn into_config(self) -> (ShellConfig, FrontEnd) {
        let front = FrontEnd {
            log_level: self.log_level(),
            prompt: (!self.no_prompt).then_some(self.prompt),
        };
        let config = ShellConfig {
            max_jobs: self.max_jobs,
            poll_interval: Duration::from_millis(self.poll_ms),
        };
        (config, front)
    }
}
