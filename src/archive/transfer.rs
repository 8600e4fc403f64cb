//! Block-wise payload transfers between the archive and files or memory.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use bytes::Bytes;
use tracing::{debug, warn};

use super::entry::EntryDescriptor;
use super::writer::ArchiveWriter;
use crate::error::{ArchiveError, Result};

/// Stream the file at `source` into the archive as `archive_path`.
///
/// The source is opened before anything is written, so an unreadable file
/// leaves the archive untouched. A failure after the header went out rolls
/// the partial entry back. Returns the number of payload bytes stored.
pub fn append_file(
    writer: &mut ArchiveWriter,
    source: &Path,
    archive_path: &str,
    block_size: usize,
) -> Result<u64> {
    let file = File::open(source)
        .map_err(|e| ArchiveError::io(format!("opening {}", source.display()), e))?;
    let metadata = file
        .metadata()
        .map_err(|e| ArchiveError::io(format!("reading metadata of {}", source.display()), e))?;
    let descriptor = EntryDescriptor::for_source(archive_path, &metadata);

    writer.begin_entry(&descriptor)?;
    debug!("writing {} -> {archive_path}", source.display());

    // Never copy past the size recorded in the header
    let mut reader = file.take(descriptor.size);
    let mut buf = vec![0u8; block_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if let Err(rollback) = writer.abort_entry() {
                    warn!("failed to roll back {archive_path}: {rollback}");
                }
                return Err(ArchiveError::io(format!("reading {}", source.display()), e));
            }
        };
        writer.write_block(&buf[..n])?;
    }

    writer.commit_entry()?;
    Ok(descriptor.size)
}

/// Disk-side handle for one extracted file. Metadata from the descriptor
/// is applied once all data is in.
struct DiskWriter {
    file: File,
    path: PathBuf,
    mode: u32,
    mtime: Option<u64>,
}

impl DiskWriter {
    fn create(target: &Path, descriptor: &EntryDescriptor, preserve_mtime: bool) -> Result<Self> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ArchiveError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }
        let file = File::create(target)
            .map_err(|e| ArchiveError::io(format!("creating {}", target.display()), e))?;

        Ok(DiskWriter {
            file,
            path: target.to_path_buf(),
            mode: descriptor.mode,
            mtime: preserve_mtime.then_some(descriptor.mtime),
        })
    }

    fn write_block(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .map_err(|e| ArchiveError::io(format!("writing {}", self.path.display()), e))
    }

    /// Remove a file whose payload turned out to be incomplete
    fn discard(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("could not remove partial file {}: {e}", self.path.display());
        }
    }

    fn finish(mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| ArchiveError::io(format!("flushing {}", self.path.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(self.mode & 0o7777);
            self.file.set_permissions(perms).map_err(|e| {
                ArchiveError::io(format!("setting permissions on {}", self.path.display()), e)
            })?;
        }

        if let Some(mtime) = self.mtime {
            self.file
                .set_modified(UNIX_EPOCH + Duration::from_secs(mtime))
                .map_err(|e| {
                    ArchiveError::io(format!("setting mtime on {}", self.path.display()), e)
                })?;
        }
        Ok(())
    }
}

/// Copy the payload of the current archive entry to `target`.
///
/// Read failures on the archive side come back as codec errors; failures
/// on the disk side as I/O errors. Returns the number of bytes written.
pub fn extract_to_disk<R: Read>(
    entry: &mut R,
    descriptor: &EntryDescriptor,
    target: &Path,
    block_size: usize,
    preserve_mtime: bool,
) -> Result<u64> {
    let mut disk = DiskWriter::create(target, descriptor, preserve_mtime)?;

    let mut buf = vec![0u8; block_size];
    let mut total = 0u64;
    loop {
        let n = read_block(entry, &mut buf, &descriptor.archive_path)?;
        if n == 0 {
            break;
        }
        disk.write_block(&buf[..n])?;
        total += n as u64;
    }

    if let Err(e) = check_complete(descriptor, total) {
        disk.discard();
        return Err(e);
    }
    disk.finish()?;
    Ok(total)
}

/// Read the payload of the current archive entry into memory
pub fn read_to_memory<R: Read>(
    entry: &mut R,
    descriptor: &EntryDescriptor,
    block_size: usize,
) -> Result<Bytes> {
    // The size comes from an untrusted header, so only use it as a hint
    let mut out = Vec::with_capacity(descriptor.size.min(16 * 1024 * 1024) as usize);
    let mut buf = vec![0u8; block_size];
    loop {
        let n = read_block(entry, &mut buf, &descriptor.archive_path)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    check_complete(descriptor, out.len() as u64)?;
    Ok(Bytes::from(out))
}

/// The codec ends an entry quietly when the archive runs out, so a short
/// payload only shows up in the byte count.
fn check_complete(descriptor: &EntryDescriptor, read: u64) -> Result<()> {
    if read == descriptor.size {
        return Ok(());
    }
    Err(ArchiveError::codec(
        format!("reading data of {}", descriptor.archive_path),
        std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("got {read} of {} bytes", descriptor.size),
        ),
    ))
}

/// Next data block of an entry; 0 means end of entry
fn read_block<R: Read>(entry: &mut R, buf: &mut [u8], archive_path: &str) -> Result<usize> {
    loop {
        match entry.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ArchiveError::codec(format!("reading data of {archive_path}"), e));
            }
        }
    }
}
