//! Output utilities for shell commands with BrokenPipe handling.
//!
//! `tarkeep cat` is often piped into `head`, which closes the pipe early.
//! Instead of erroring, these return `Ok(())` from the calling function.

/// Print with newline, handling BrokenPipe gracefully.
///
/// Returns `Ok(())` early if BrokenPipe is encountered (e.g., when piped to `head`).
/// Propagates other IO errors.
#[macro_export]
macro_rules! print_line {
    ($($arg:tt)*) => {{
        use std::io::Write;
        match writeln!(std::io::stdout(), $($arg)*) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}

/// Write raw bytes to stdout, handling BrokenPipe gracefully.
#[macro_export]
macro_rules! print_bytes {
    ($bytes:expr) => {{
        use std::io::Write;
        let mut stdout = std::io::stdout().lock();
        match stdout.write_all($bytes).and_then(|()| stdout.flush()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}

pub use print_bytes;
pub use print_line;
