//! Append-friendly sessions over single-file tar archives.
//!
//! An [`ArchiveSession`] opens one archive either read-only or read-write.
//! Read-write sessions append new entries after the last complete entry
//! already in the file, so repeated sessions build up one archive
//! incrementally. Any session can test for, list, read and extract entries.
//!
//! ```no_run
//! use tarkeep::{ArchiveSession, OpenMode};
//!
//! # fn main() -> tarkeep::Result<()> {
//! let mut session = ArchiveSession::new();
//! session.open("backup.tar", OpenMode::ReadWrite)?;
//! session.add_folder("notes")?;
//! session.close()?;
//!
//! session.open("backup.tar", OpenMode::ReadOnly)?;
//! if let Some(bytes) = session.get_entry("todo.txt")? {
//!     println!("{}", String::from_utf8_lossy(&bytes));
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod session;
pub mod shell;
pub mod ui;
pub mod walk;

pub use archive::{EntryDescriptor, EntryKind};
pub use config::{DEFAULT_BLOCK_SIZE, SessionOptions};
pub use error::{ArchiveError, Result};
pub use session::{AddSummary, ArchiveSession, ExtractSummary, OpenMode};
