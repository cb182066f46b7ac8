//! Async-signal-safe console output
//!
//! `println!` takes the stdout lock and may allocate, so a handler that used it
//! could deadlock against the main flow it interrupted. Handlers format into a
//! fixed stack buffer instead and hand the bytes straight to write(2).

use core::fmt::{self, Write};

const BUFFER_SIZE: usize = 256;

/// Stack buffer for one line of handler output
pub struct SignalWriter {
    buffer: [u8; BUFFER_SIZE],
    position: usize,
}

impl SignalWriter {
    pub const fn new() -> Self {
        SignalWriter {
            buffer: [0; BUFFER_SIZE],
            position: 0,
        }
    }

    /// Bytes formatted so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Write the buffered bytes to stdout and reset the buffer
    pub fn flush(&mut self) {
        write_all(libc::STDOUT_FILENO, self.as_bytes());
        self.position = 0;
    }
}

impl Default for SignalWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for SignalWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = BUFFER_SIZE - self.position;

        // Keep what fits; a clipped notification beats none at all
        let take = bytes.len().min(remaining);
        self.buffer[self.position..self.position + take].copy_from_slice(&bytes[..take]);
        self.position += take;

        if take < bytes.len() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

/// write(2) until done, retrying on EINTR and giving up on any other error
fn write_all(fd: libc::c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: `bytes` is a valid, initialized slice for its whole length.
        let ret = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if ret > 0 {
            bytes = &bytes[ret as usize..];
        } else if ret < 0 && nix::errno::Errno::last() == nix::errno::Errno::EINTR {
            continue;
        } else {
            return;
        }
    }
}

/// Format one line to stdout without locking or allocating.
///
/// Usable from signal handlers.
pub fn emit(args: fmt::Arguments<'_>) {
    let mut w = SignalWriter::new();
    let _ = w.write_fmt(args);
    if w.position < BUFFER_SIZE {
        w.buffer[w.position] = b'\n';
        w.position += 1;
    } else {
        w.buffer[BUFFER_SIZE - 1] = b'\n';
    }
    w.flush();
}

/// `println!` for signal handlers
#[macro_export]
macro_rules! signal_println {
    ($($arg:tt)*) => {
        $crate::console::emit(format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_into_stack_buffer() {
        let mut w = SignalWriter::new();
        write!(w, "Job [{}] ({}) terminated by signal {}", 1, 4242, 2).unwrap();
        assert_eq!(w.as_bytes(), b"Job [1] (4242) terminated by signal 2");
    }

    #[test]
    fn overflow_is_clipped_not_panicking() {
        let mut w = SignalWriter::new();
        let long = "x".repeat(BUFFER_SIZE + 10);
        assert!(w.write_str(&long).is_err());
        assert_eq!(w.as_bytes().len(), BUFFER_SIZE);
    }

    #[test]
    fn default_is_empty() {
        assert!(SignalWriter::default().as_bytes().is_empty());
    }
}
