use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::entry::EntryDescriptor;
use super::{END_OF_DATA, TAR_BLOCK, round_up_512};
use crate::error::{ArchiveError, Result};

/// Bookkeeping for the entry currently being written
#[derive(Debug)]
struct PendingEntry {
    /// Offset of the entry's first header block
    start: u64,
    /// Bytes taken by the header block(s)
    header_len: u64,
    declared: u64,
    written: u64,
}

/// Positioned write handle over an archive file.
///
/// The cursor starts at the end of the existing data and only moves
/// forward, one committed entry at a time. After every commit the
/// end-of-data marker is written and the cursor moved back in front of it,
/// so the file is a complete archive between appends.
#[derive(Debug)]
pub struct ArchiveWriter {
    file: File,
    path: PathBuf,
    /// End of committed data; where the next header goes
    position: u64,
    pending: Option<PendingEntry>,
}

impl ArchiveWriter {
    /// Open `path` for writing, creating it if needed. Existing content is
    /// left untouched; call [`ArchiveWriter::seek_to`] to choose where
    /// appends start.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                ArchiveError::io(format!("opening {} for writing", path.display()), e)
            })?;

        Ok(ArchiveWriter {
            file,
            path: path.to_path_buf(),
            position: 0,
            pending: None,
        })
    }

    /// Move the append cursor to `offset`
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.write_error("seeking", e))?;
        self.position = offset;
        debug!("append cursor for {} at {offset}", self.path.display());
        Ok(())
    }

    /// Offset at which the next entry will be written
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write the header for a new entry. Data blocks follow through
    /// [`ArchiveWriter::write_block`].
    pub fn begin_entry(&mut self, descriptor: &EntryDescriptor) -> Result<()> {
        if self.pending.is_some() {
            self.abort_entry()?;
        }

        let header = descriptor.encode_header().map_err(|e| {
            ArchiveError::codec(format!("encoding header for {}", descriptor.archive_path), e)
        })?;

        self.pending = Some(PendingEntry {
            start: self.position,
            header_len: header.len() as u64,
            declared: descriptor.size,
            written: 0,
        });

        if let Err(e) = self.file.write_all(&header) {
            let err = self.write_error("writing header", e);
            self.abort_or_warn();
            return Err(err);
        }
        Ok(())
    }

    /// Append one block of payload to the current entry
    pub fn write_block(&mut self, data: &[u8]) -> Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Err(ArchiveError::codec(
                "writing data block",
                std::io::Error::other("no entry in progress"),
            ));
        };

        if pending.written + data.len() as u64 > pending.declared {
            let declared = pending.declared;
            self.abort_or_warn();
            return Err(ArchiveError::codec(
                "writing data block",
                std::io::Error::other(format!("entry exceeds its declared size of {declared}")),
            ));
        }

        if let Err(e) = self.file.write_all(data) {
            let err = self.write_error("writing data block", e);
            self.abort_or_warn();
            return Err(err);
        }
        pending.written += data.len() as u64;
        Ok(())
    }

    /// Pad the current entry to a block boundary and make it permanent
    pub fn commit_entry(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        if pending.written != pending.declared {
            self.pending = Some(pending);
            let err = ArchiveError::codec(
                "committing entry",
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "entry is shorter than its declared size",
                ),
            );
            self.abort_or_warn();
            return Err(err);
        }

        let padding = (round_up_512(pending.declared) - pending.declared) as usize;
        let end = pending.start + pending.header_len + round_up_512(pending.declared);

        let result = self
            .file
            .write_all(&[0u8; TAR_BLOCK][..padding])
            .and_then(|()| self.file.write_all(&END_OF_DATA))
            .and_then(|()| self.file.seek(SeekFrom::Start(end)).map(|_| ()));

        if let Err(e) = result {
            self.pending = Some(pending);
            let err = self.write_error("committing entry", e);
            self.abort_or_warn();
            return Err(err);
        }

        self.position = end;
        Ok(())
    }

    /// Throw away a partially written entry by overwriting its first header
    /// with the end-of-data marker. Committed entries are never touched.
    pub fn abort_entry(&mut self) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            debug!(
                "rolling back partial entry at {} in {}",
                pending.start,
                self.path.display()
            );
        }
        self.write_terminator()
    }

    /// Write the end-of-data marker and flush everything to disk
    pub fn finish(mut self) -> Result<()> {
        if self.pending.is_some() {
            self.abort_entry()?;
        } else {
            self.write_terminator()?;
        }
        self.file
            .sync_all()
            .map_err(|e| self.write_error("syncing", e))
    }

    fn write_terminator(&mut self) -> Result<()> {
        let position = self.position;
        self.file
            .seek(SeekFrom::Start(position))
            .and_then(|_| self.file.write_all(&END_OF_DATA))
            .and_then(|()| self.file.seek(SeekFrom::Start(position)).map(|_| ()))
            .and_then(|()| self.file.flush())
            .map_err(|e| self.write_error("writing end-of-data marker", e))
    }

    fn abort_or_warn(&mut self) {
        if let Err(e) = self.abort_entry() {
            warn!("failed to roll back partial entry: {e}");
        }
    }

    fn write_error(&self, what: &str, source: std::io::Error) -> ArchiveError {
        ArchiveError::io(format!("{what} {}", self.path.display()), source)
    }
}
