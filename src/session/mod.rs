//! Archive sessions: the open/closed lifecycle around one archive file.
//!
//! A session holds two independent cursors over the archive. The read
//! descriptor is rewound before every scan (`entry_exists`,
//! `extract_entries`, `get_entry`, `list_entries`) because the tar codec
//! only moves forward. The write descriptor, present in read-write
//! sessions only, is positioned once at open time, right after the last
//! entry already in the file, and only ever moves forward from there.
//!
//! Lookups are linear scans from the first header. When an archive path
//! occurs more than once, the first occurrence wins.

mod summary;

pub use summary::{AddSummary, ExtractSummary};

use std::collections::HashSet;
use std::fs::{self, File};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::archive::reader::{rewind, scan_entries};
use crate::archive::transfer::{append_file, extract_to_disk, read_to_memory};
use crate::archive::{
    ArchiveWriter, EntryDescriptor, EntryKind, is_safe_archive_path, locate_append_offset,
};
use crate::config::SessionOptions;
use crate::error::{ArchiveError, Result};
use crate::walk::{SourceEntry, base_name, is_regular_file, relative_archive_path, source_entries};

/// How an archive is opened. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

impl OpenMode {
    pub fn from_read_only(read_only: bool) -> Self {
        if read_only {
            OpenMode::ReadOnly
        } else {
            OpenMode::ReadWrite
        }
    }
}

enum SessionState {
    Closed,
    ReadOnly {
        path: PathBuf,
        reader: File,
    },
    ReadWrite {
        path: PathBuf,
        /// Opened at session start; reopened lazily if that failed
        reader: Option<File>,
        writer: ArchiveWriter,
    },
}

/// Stateful handle over a single tar archive
pub struct ArchiveSession {
    options: SessionOptions,
    state: SessionState,
}

impl Default for ArchiveSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveSession {
    /// Create a closed session with default options
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    /// Create a closed session with the given options
    pub fn with_options(options: SessionOptions) -> Self {
        ArchiveSession {
            options,
            state: SessionState::Closed,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, SessionState::Closed)
    }

    pub fn mode(&self) -> Option<OpenMode> {
        match self.state {
            SessionState::Closed => None,
            SessionState::ReadOnly { .. } => Some(OpenMode::ReadOnly),
            SessionState::ReadWrite { .. } => Some(OpenMode::ReadWrite),
        }
    }

    /// Path of the open archive
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Closed => None,
            SessionState::ReadOnly { path, .. } | SessionState::ReadWrite { path, .. } => {
                Some(path)
            }
        }
    }

    /// Offset the next appended entry will be written at (read-write only)
    pub fn append_offset(&self) -> Option<u64> {
        match &self.state {
            SessionState::ReadWrite { writer, .. } => Some(writer.position()),
            _ => None,
        }
    }

    /// Open an archive.
    ///
    /// Read-only sessions need an existing, readable file. Read-write
    /// sessions create the file when it is missing and position the write
    /// cursor after the last complete entry; an undecodable file counts as
    /// empty and is overwritten from the start.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: OpenMode) -> Result<()> {
        if let Some(current) = self.path() {
            return Err(ArchiveError::AlreadyOpen(current.to_path_buf()));
        }
        self.options.validate()?;

        let path = path.as_ref().to_path_buf();
        self.state = match mode {
            OpenMode::ReadOnly => {
                let reader = File::open(&path).map_err(|e| {
                    ArchiveError::io(format!("opening {} for reading", path.display()), e)
                })?;
                info!("opened {} read-only", path.display());
                SessionState::ReadOnly { path, reader }
            }
            OpenMode::ReadWrite => {
                let mut writer = ArchiveWriter::open(&path)?;
                let reader = match File::open(&path) {
                    Ok(file) => Some(file),
                    Err(e) => {
                        warn!("could not open {} for reading: {e}", path.display());
                        None
                    }
                };
                writer.seek_to(locate_append_offset(&path))?;
                info!(
                    "opened {} read-write, appending at {}",
                    path.display(),
                    writer.position()
                );
                SessionState::ReadWrite {
                    path,
                    reader,
                    writer,
                }
            }
        };
        Ok(())
    }

    /// Recursively store every regular file under `source_dir`, named by
    /// its path relative to `source_dir`. Symlinks to regular files are
    /// stored with the target's contents; other non-directories are skipped.
    ///
    /// A traversal error stops the walk and is returned; entries stored
    /// before it stay in the archive. Failures on individual files are
    /// logged and counted.
    pub fn add_folder(&mut self, source_dir: impl AsRef<Path>) -> Result<AddSummary> {
        let root = source_dir.as_ref();
        let block_size = self.options.block_size;
        let own_file = self.path().and_then(|p| fs::canonicalize(p).ok());
        let writer = self.writer()?;

        if !root.is_dir() {
            return Err(ArchiveError::NotADirectory(root.to_path_buf()));
        }
        info!("archiving directory {}", root.display());

        let mut summary = AddSummary::default();
        for entry in source_entries(root) {
            let file = match entry? {
                SourceEntry::File(file) => file,
                SourceEntry::Unsupported(path) => {
                    info!("{} is not a regular file, skipping", path.display());
                    summary.skipped += 1;
                    continue;
                }
            };
            if own_file.is_some() && fs::canonicalize(&file).ok() == own_file {
                debug!("skipping the archive itself: {}", file.display());
                summary.skipped += 1;
                continue;
            }

            let archive_path = relative_archive_path(root, &file)?;
            match append_file(writer, &file, &archive_path, block_size) {
                Ok(bytes) => summary.record_added(bytes),
                Err(e) => {
                    warn!("failed to add {}: {e}", file.display());
                    summary.failed += 1;
                }
            }
        }

        info!(
            "added {} files ({} bytes) from {}",
            summary.added,
            summary.bytes,
            root.display()
        );
        Ok(summary)
    }

    /// Append each listed file under its base name. Paths that are not
    /// regular files are skipped; failures are logged and the batch
    /// carries on.
    pub fn add_entries<I, P>(&mut self, files: I) -> Result<AddSummary>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let block_size = self.options.block_size;
        let writer = self.writer()?;

        let mut summary = AddSummary::default();
        for file in files {
            let file = file.as_ref();
            let name = match base_name(file) {
                Some(name) if is_regular_file(file) => name,
                _ => {
                    info!("{} is not a valid file, skipping", file.display());
                    summary.skipped += 1;
                    continue;
                }
            };

            match append_file(writer, file, &name, block_size) {
                Ok(bytes) => summary.record_added(bytes),
                Err(e) => {
                    warn!("failed to add {}: {e}", file.display());
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Whether an entry named exactly `archive_path` is stored
    pub fn entry_exists(&mut self, archive_path: &str) -> Result<bool> {
        let mut found = false;
        scan_entries(self.reader()?, |descriptor, _| {
            if descriptor.archive_path == archive_path {
                found = true;
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;

        debug!("entry {archive_path} exists: {found}");
        Ok(found)
    }

    /// Extract entries below `target_dir`. Without a filter every entry is
    /// extracted; with one, only entries whose archive path is listed.
    /// Listed names that are not in the archive are ignored.
    ///
    /// A decode error in the archive aborts the call. Failures on the disk
    /// side are logged, counted, and the scan continues.
    pub fn extract_entries<S: AsRef<str>>(
        &mut self,
        target_dir: impl AsRef<Path>,
        filter: Option<&[S]>,
    ) -> Result<ExtractSummary> {
        let target_dir = target_dir.as_ref();
        let wanted: Option<HashSet<&str>> =
            filter.map(|names| names.iter().map(AsRef::as_ref).collect());
        let block_size = self.options.block_size;
        let preserve_mtime = self.options.preserve_mtime;

        info!("extracting into {}", target_dir.display());
        let mut summary = ExtractSummary::default();
        scan_entries(self.reader()?, |descriptor, entry| {
            if let Some(wanted) = &wanted
                && !wanted.contains(descriptor.archive_path.as_str())
            {
                debug!("skipping {}", descriptor.archive_path);
                summary.skipped += 1;
                return Ok(ControlFlow::Continue(()));
            }

            if !is_safe_archive_path(&descriptor.archive_path) {
                warn!("{}", ArchiveError::UnsafePath(descriptor.archive_path.clone()));
                summary.failed += 1;
                return Ok(ControlFlow::Continue(()));
            }

            let target = target_dir.join(&descriptor.archive_path);
            let result = match descriptor.kind {
                EntryKind::Regular => {
                    debug!("extracting {} -> {}", descriptor.archive_path, target.display());
                    extract_to_disk(entry, descriptor, &target, block_size, preserve_mtime)
                        .map(Some)
                }
                EntryKind::Directory => fs::create_dir_all(&target)
                    .map(|()| Some(0))
                    .map_err(|e| {
                        ArchiveError::io(format!("creating directory {}", target.display()), e)
                    }),
                EntryKind::Other => Ok(None),
            };

            match result {
                Ok(Some(bytes)) => summary.record_extracted(bytes),
                Ok(None) => {
                    debug!("skipping unsupported entry {}", descriptor.archive_path);
                    summary.skipped += 1;
                }
                Err(e) if e.is_codec() => return Err(e),
                Err(e) => {
                    warn!("failed to extract {}: {e}", descriptor.archive_path);
                    summary.failed += 1;
                }
            }
            Ok(ControlFlow::Continue(()))
        })?;

        info!(
            "extracted {} entries ({} bytes), skipped {}, failed {}",
            summary.extracted, summary.bytes, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Bytes of the first entry named `archive_path`, or `None` when the
    /// archive has no such entry
    pub fn get_entry(&mut self, archive_path: &str) -> Result<Option<Bytes>> {
        let block_size = self.options.block_size;
        let mut found = None;
        scan_entries(self.reader()?, |descriptor, entry| {
            if descriptor.archive_path != archive_path {
                return Ok(ControlFlow::Continue(()));
            }
            found = Some(read_to_memory(entry, descriptor, block_size)?);
            Ok(ControlFlow::Break(()))
        })?;

        if found.is_none() {
            debug!("entry {archive_path} not found");
        }
        Ok(found)
    }

    /// Descriptors of every entry, in archive order
    pub fn list_entries(&mut self) -> Result<Vec<EntryDescriptor>> {
        let mut entries = Vec::new();
        scan_entries(self.reader()?, |descriptor, _| {
            entries.push(descriptor.clone());
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(entries)
    }

    /// Close the archive. Read-write sessions write the end-of-data marker
    /// and sync the file. The session is closed afterwards even if that
    /// fails.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Closed => Err(ArchiveError::NotOpen),
            SessionState::ReadOnly { path, reader } => {
                drop(reader);
                info!("closed {}", path.display());
                Ok(())
            }
            SessionState::ReadWrite {
                path,
                reader,
                writer,
            } => {
                drop(reader);
                let result = writer.finish();
                info!("closed {}", path.display());
                result
            }
        }
    }

    /// Read descriptor, rewound to the first header
    fn reader(&mut self) -> Result<&File> {
        let file = match &mut self.state {
            SessionState::Closed => return Err(ArchiveError::NotOpen),
            SessionState::ReadOnly { reader, .. } => &*reader,
            SessionState::ReadWrite { path, reader, .. } => {
                if reader.is_none() {
                    let file = File::open(&*path).map_err(|e| {
                        ArchiveError::io(format!("opening {} for reading", path.display()), e)
                    })?;
                    *reader = Some(file);
                }
                reader.as_ref().ok_or(ArchiveError::NotOpen)?
            }
        };
        rewind(file)?;
        Ok(file)
    }

    fn writer(&mut self) -> Result<&mut ArchiveWriter> {
        match &mut self.state {
            SessionState::Closed => Err(ArchiveError::NotOpen),
            SessionState::ReadOnly { path, .. } => Err(ArchiveError::ReadOnly(path.clone())),
            SessionState::ReadWrite { writer, .. } => Ok(writer),
        }
    }
}

impl Drop for ArchiveSession {
    fn drop(&mut self) {
        if self.is_open()
            && let Err(e) = self.close()
        {
            warn!("failed to close archive on drop: {e}");
        }
    }
}

#[cfg(test)]
mod tests;
