//! Filesystem side of archiving: finding the files to store and naming them.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ArchiveError, Result};

/// Something found under a source directory that is not a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    /// A regular file, or a symlink to one
    File(PathBuf),
    /// Anything else: dangling links, links to directories, sockets, fifos
    Unsupported(PathBuf),
}

/// Recursively list what lies under `root`, in a stable (file-name sorted)
/// order. Directories are descended into but not yielded. Symlinks are
/// not followed while walking; a link to a regular file is reported as a
/// file. Access errors are yielded in place so the caller decides whether
/// to stop.
pub fn source_entries(root: &Path) -> impl Iterator<Item = Result<SourceEntry>> + use<> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) if entry.file_type().is_file() => {
                Some(Ok(SourceEntry::File(entry.into_path())))
            }
            Ok(entry) if entry.path_is_symlink() && is_regular_file(entry.path()) => {
                Some(Ok(SourceEntry::File(entry.into_path())))
            }
            Ok(entry) => Some(Ok(SourceEntry::Unsupported(entry.into_path()))),
            Err(e) => Some(Err(ArchiveError::Walk(e))),
        })
}

/// Archive path of `file` relative to `root`, with `/` between segments.
///
/// `dir/sub/file.txt` under `dir` becomes `sub/file.txt`.
pub fn relative_archive_path(root: &Path, file: &Path) -> Result<String> {
    let outside = || ArchiveError::OutsideRoot {
        path: file.to_path_buf(),
        root: root.to_path_buf(),
    };

    let relative = file.strip_prefix(root).map_err(|_| outside())?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(lossy_name(segment)),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }

    if segments.is_empty() {
        return Err(outside());
    }
    Ok(segments.join("/"))
}

/// Archive path used by flat appends: just the file name
pub fn base_name(file: &Path) -> Option<String> {
    file.file_name().map(|name| lossy_name(name).into_owned())
}

/// Archive paths are UTF-8; invalid bytes become U+FFFD
fn lossy_name(name: &OsStr) -> Cow<'_, str> {
    let converted = name.to_string_lossy();
    if let Cow::Owned(replaced) = &converted {
        debug!("file name {name:?} is not UTF-8, storing it as {replaced:?}");
    }
    converted
}

/// Whether `path` exists and is a regular file (symlinks are followed)
pub fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_archive_path() {
        let root = Path::new("/data/source");
        assert_eq!(
            relative_archive_path(root, Path::new("/data/source/file1")).unwrap(),
            "file1"
        );
        assert_eq!(
            relative_archive_path(root, Path::new("/data/source/dir1/dir2/file2")).unwrap(),
            "dir1/dir2/file2"
        );
    }

    #[test]
    fn test_relative_archive_path_outside_root() {
        let root = Path::new("/data/source");
        assert!(matches!(
            relative_archive_path(root, Path::new("/data/other/file")),
            Err(ArchiveError::OutsideRoot { .. })
        ));
        assert!(relative_archive_path(root, root).is_err());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/tmp/x.txt")).as_deref(), Some("x.txt"));
        assert_eq!(base_name(Path::new("/")), None);
    }

    fn files_only(root: &Path) -> Vec<String> {
        source_entries(root)
            .filter_map(|entry| match entry.unwrap() {
                SourceEntry::File(f) => Some(relative_archive_path(root, &f).unwrap()),
                SourceEntry::Unsupported(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_source_entries_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/empty")).unwrap();
        fs::write(dir.path().join("b/inner.txt"), b"x").unwrap();
        fs::write(dir.path().join("a.txt"), b"y").unwrap();

        assert_eq!(files_only(dir.path()), vec!["a.txt", "b/inner.txt"]);
    }

    #[test]
    fn test_source_entries_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut entries = source_entries(&dir.path().join("missing"));
        assert!(matches!(entries.next(), Some(Err(ArchiveError::Walk(_)))));
    }

    #[cfg(unix)]
    #[test]
    fn test_source_entries_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("target.txt"), b"t").unwrap();
        fs::create_dir(outside.path().join("target_dir")).unwrap();
        fs::write(outside.path().join("target_dir/hidden.txt"), b"h").unwrap();

        symlink(outside.path().join("target.txt"), dir.path().join("file_link")).unwrap();
        symlink(outside.path().join("target_dir"), dir.path().join("dir_link")).unwrap();
        symlink(outside.path().join("gone"), dir.path().join("dangling")).unwrap();

        let entries: Vec<SourceEntry> = source_entries(dir.path()).map(Result::unwrap).collect();
        assert_eq!(
            entries,
            vec![
                SourceEntry::Unsupported(dir.path().join("dangling")),
                SourceEntry::Unsupported(dir.path().join("dir_link")),
                SourceEntry::File(dir.path().join("file_link")),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_replaced() {
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"bad\xff.txt");
        let file = Path::new("/data").join(name);
        assert_eq!(base_name(&file).as_deref(), Some("bad\u{fffd}.txt"));
        assert_eq!(
            relative_archive_path(Path::new("/data"), &file).unwrap(),
            "bad\u{fffd}.txt"
        );
    }
}
