use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by archive sessions and the codec glue around them.
///
/// A missing entry is never an error: lookups report it as `Ok(false)` or
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no archive is open")]
    NotOpen,

    #[error("an archive is already open: {0}")]
    AlreadyOpen(PathBuf),

    #[error("archive is open read-only: {0}")]
    ReadOnly(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("tar codec error: {context}: {source}")]
    Codec {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("refusing unsafe archive path: {0}")]
    UnsafePath(String),

    #[error("path {path} is outside of {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("directory traversal failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl ArchiveError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        ArchiveError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn codec(context: impl Into<String>, source: io::Error) -> Self {
        ArchiveError::Codec {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure came from the archive stream itself rather than
    /// from the file on the other side of a transfer. Codec failures leave
    /// the read cursor in an unknown place, so a scan cannot continue.
    pub fn is_codec(&self) -> bool {
        matches!(self, ArchiveError::Codec { .. })
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
