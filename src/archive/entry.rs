use std::fs::Metadata;
use std::io::{self, Read};
use std::path::{Component, Path};

use tar::{EntryType, Header};
use tracing::debug;

use super::{TAR_BLOCK, round_up_512};

/// Permission bits given to every stored file (rw-r--r--)
pub const DEFAULT_MODE: u32 = 0o644;

/// Width of the name field in a tar header
const NAME_FIELD_LEN: usize = 100;

/// Name used by GNU tar for long-name extension records
const GNU_LONG_LINK: &[u8] = b"././@LongLink";

/// Kind of an archive entry. Only regular files are ever written; the
/// other kinds show up when scanning archives built by other tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Other,
}

impl EntryKind {
    fn from_tar(entry_type: EntryType) -> Self {
        if entry_type.is_file() {
            EntryKind::Regular
        } else if entry_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        }
    }
}

/// Metadata for one entry, built right before it is written or right after
/// its header is decoded. Lives only for the transfer it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub archive_path: String,
    pub size: u64,
    pub kind: EntryKind,
    pub mode: u32,
    /// Seconds since the epoch. Always 0 for entries written by this crate.
    pub mtime: u64,
}

impl EntryDescriptor {
    /// Describe a source file about to be stored as `archive_path`.
    ///
    /// Only the size comes from the source; timestamps and ownership are
    /// not carried over.
    pub fn for_source(archive_path: impl Into<String>, metadata: &Metadata) -> Self {
        Self {
            archive_path: archive_path.into(),
            size: metadata.len(),
            kind: EntryKind::Regular,
            mode: DEFAULT_MODE,
            mtime: 0,
        }
    }

    /// Decode the descriptor of an entry produced by a header scan
    pub fn from_entry<R: Read>(entry: &tar::Entry<'_, R>) -> Self {
        let header = entry.header();
        let raw_path = entry.path_bytes();
        let archive_path = String::from_utf8_lossy(&raw_path).into_owned();
        if archive_path.as_bytes() != &*raw_path {
            debug!("entry name {raw_path:?} is not UTF-8, reading it as {archive_path:?}");
        }
        Self {
            archive_path,
            size: entry.size(),
            kind: EntryKind::from_tar(header.entry_type()),
            mode: header.mode().unwrap_or(DEFAULT_MODE),
            mtime: header.mtime().unwrap_or(0),
        }
    }

    pub fn is_regular(&self) -> bool {
        self.kind == EntryKind::Regular
    }

    /// Encode the header block(s) for this entry.
    ///
    /// Paths longer than the name field are preceded by a GNU long-name
    /// record; the main header then carries the truncated name.
    pub(crate) fn encode_header(&self) -> io::Result<Vec<u8>> {
        let path = self.archive_path.as_bytes();
        let mut out = Vec::with_capacity(TAR_BLOCK);
        let mut header = Header::new_gnu();

        if path.len() >= NAME_FIELD_LEN {
            let mut long = Header::new_gnu();
            if let Some(gnu) = long.as_gnu_mut() {
                gnu.name[..GNU_LONG_LINK.len()].copy_from_slice(GNU_LONG_LINK);
            }
            long.set_mode(DEFAULT_MODE);
            long.set_mtime(0);
            long.set_size(path.len() as u64 + 1);
            long.set_entry_type(EntryType::GNULongName);
            long.set_cksum();

            out.extend_from_slice(long.as_bytes());
            out.extend_from_slice(path);
            out.push(0);
            out.resize(round_up_512(out.len() as u64) as usize, 0);

            header.as_old_mut().name.copy_from_slice(&path[..NAME_FIELD_LEN]);
        } else {
            header.set_path(&self.archive_path)?;
        }

        header.set_size(self.size);
        header.set_mode(self.mode);
        header.set_mtime(self.mtime);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        out.extend_from_slice(header.as_bytes());

        Ok(out)
    }
}

/// Check that an archive path is relative and never climbs out of the
/// directory it gets extracted into.
pub fn is_safe_archive_path(archive_path: &str) -> bool {
    if archive_path.is_empty() {
        return false;
    }
    Path::new(archive_path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str, size: u64) -> EntryDescriptor {
        EntryDescriptor {
            archive_path: path.to_string(),
            size,
            kind: EntryKind::Regular,
            mode: DEFAULT_MODE,
            mtime: 0,
        }
    }

    #[test]
    fn test_for_source_uses_fixed_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"twelve bytes").unwrap();
        let metadata = std::fs::metadata(&path).unwrap();

        let desc = EntryDescriptor::for_source("data.bin", &metadata);
        assert_eq!(desc.archive_path, "data.bin");
        assert_eq!(desc.size, 12);
        assert_eq!(desc.kind, EntryKind::Regular);
        assert_eq!(desc.mode, 0o644);
        assert_eq!(desc.mtime, 0);
    }

    #[test]
    fn test_encode_short_header() {
        let bytes = descriptor("dir/file.txt", 100).encode_header().unwrap();
        assert_eq!(bytes.len(), TAR_BLOCK);

        let header = Header::from_byte_slice(&bytes);
        assert_eq!(&*header.path_bytes(), b"dir/file.txt");
        assert_eq!(header.size().unwrap(), 100);
        assert_eq!(header.mode().unwrap(), 0o644);
        assert!(header.entry_type().is_file());
    }

    #[test]
    fn test_encode_long_header() {
        let long_path = format!("{}/file.txt", "nested".repeat(30));
        let bytes = descriptor(&long_path, 0).encode_header().unwrap();

        // long-name header + one block of name data + real header
        assert_eq!(bytes.len(), TAR_BLOCK * 3);
        let long = Header::from_byte_slice(&bytes[..TAR_BLOCK]);
        assert_eq!(long.entry_type(), EntryType::GNULongName);
        assert_eq!(long.size().unwrap(), long_path.len() as u64 + 1);
        assert_eq!(&bytes[TAR_BLOCK..TAR_BLOCK + long_path.len()], long_path.as_bytes());
    }

    #[test]
    fn test_is_safe_archive_path() {
        assert!(is_safe_archive_path("file.txt"));
        assert!(is_safe_archive_path("a/b/c.txt"));
        assert!(is_safe_archive_path("./a.txt"));
        assert!(!is_safe_archive_path(""));
        assert!(!is_safe_archive_path("/etc/passwd"));
        assert!(!is_safe_archive_path("../escape.txt"));
        assert!(!is_safe_archive_path("a/../../escape.txt"));
    }
}
