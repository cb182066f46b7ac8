use std::io::{self, Write};

use log::{LevelFilter, Log, Metadata, Record};

/// Writes `[LEVEL] target: message` lines to stderr.
///
/// Records logged while a signal relay handler is running are dropped: taking
/// the stderr lock from signal context could deadlock against the main flow.
pub struct ShellLogger;

impl ShellLogger {
    const fn new() -> Self {
        ShellLogger
    }
}

impl Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) || jobctl::relay::in_handler() {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:>5}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

static SHELL_LOGGER: ShellLogger = ShellLogger::new();

/// Install the logger. Safe to call more than once; later calls only change
/// the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&SHELL_LOGGER);
    log::set_max_level(level);
}
