use super::*;
use std::io::Write;

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents).unwrap();
    path
}

#[test]
fn test_operations_fail_when_closed() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ArchiveSession::new();

    assert!(!session.is_open());
    assert!(matches!(session.close(), Err(ArchiveError::NotOpen)));
    assert!(matches!(
        session.entry_exists("a"),
        Err(ArchiveError::NotOpen)
    ));
    assert!(matches!(session.get_entry("a"), Err(ArchiveError::NotOpen)));
    assert!(matches!(
        session.add_entries([dir.path().join("a")]),
        Err(ArchiveError::NotOpen)
    ));
    assert!(matches!(
        session.add_folder(dir.path()),
        Err(ArchiveError::NotOpen)
    ));
    assert!(matches!(
        session.extract_entries::<&str>(dir.path(), None),
        Err(ArchiveError::NotOpen)
    ));
}

#[test]
fn test_state_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.tar");
    let mut session = ArchiveSession::new();

    session.open(&archive, OpenMode::ReadWrite).unwrap();
    assert_eq!(session.mode(), Some(OpenMode::ReadWrite));
    assert_eq!(session.path(), Some(archive.as_path()));
    assert_eq!(session.append_offset(), Some(0));
    session.close().unwrap();
    assert_eq!(session.mode(), None);
    assert_eq!(session.path(), None);

    session.open(&archive, OpenMode::ReadOnly).unwrap();
    assert_eq!(session.mode(), Some(OpenMode::ReadOnly));
    assert_eq!(session.append_offset(), None);
    session.close().unwrap();
    assert!(!session.is_open());
}

#[test]
fn test_second_open_fails() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.tar");
    let mut session = ArchiveSession::new();

    session.open(&archive, OpenMode::ReadWrite).unwrap();
    assert!(matches!(
        session.open(&archive, OpenMode::ReadOnly),
        Err(ArchiveError::AlreadyOpen(_))
    ));
    // the first session is untouched
    assert_eq!(session.mode(), Some(OpenMode::ReadWrite));
}

#[test]
fn test_read_only_requires_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ArchiveSession::new();

    let result = session.open(dir.path().join("missing.tar"), OpenMode::ReadOnly);
    assert!(matches!(result, Err(ArchiveError::Io { .. })));
    assert!(!session.is_open());
    assert!(!dir.path().join("missing.tar").exists());
}

#[test]
fn test_read_write_creates_valid_empty_archive() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("new.tar");
    let mut session = ArchiveSession::new();

    session.open(&archive, OpenMode::ReadWrite).unwrap();
    assert!(session.list_entries().unwrap().is_empty());
    session.close().unwrap();

    assert_eq!(fs::metadata(&archive).unwrap().len(), 1024);
    session.open(&archive, OpenMode::ReadOnly).unwrap();
    assert!(session.list_entries().unwrap().is_empty());
}

#[test]
fn test_writes_rejected_on_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.tar");
    let source = write_file(dir.path(), "x.txt", b"hello");

    let mut session = ArchiveSession::new();
    session.open(&archive, OpenMode::ReadWrite).unwrap();
    session.add_entries([&source]).unwrap();
    session.close().unwrap();

    session.open(&archive, OpenMode::ReadOnly).unwrap();
    assert!(matches!(
        session.add_entries([&source]),
        Err(ArchiveError::ReadOnly(_))
    ));
    assert!(matches!(
        session.add_folder(dir.path()),
        Err(ArchiveError::ReadOnly(_))
    ));
}

#[test]
fn test_scan_sees_appends_within_session() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.tar");
    let first = write_file(dir.path(), "first.txt", b"1");
    let second = write_file(dir.path(), "second.txt", b"22");

    let mut session = ArchiveSession::new();
    session.open(&archive, OpenMode::ReadWrite).unwrap();
    session.add_entries([&first]).unwrap();
    assert!(session.entry_exists("first.txt").unwrap());
    assert!(!session.entry_exists("second.txt").unwrap());

    session.add_entries([&second]).unwrap();
    assert_eq!(
        session.get_entry("second.txt").unwrap().as_deref(),
        Some(&b"22"[..])
    );
    assert_eq!(session.append_offset(), Some(2048));
}

#[test]
fn test_add_entries_skips_invalid_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.tar");
    let good = write_file(dir.path(), "good.txt", b"ok");

    let mut session = ArchiveSession::new();
    session.open(&archive, OpenMode::ReadWrite).unwrap();
    let summary = session
        .add_entries([dir.path().join("missing.txt"), dir.path().to_path_buf(), good])
        .unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.bytes, 2);
    assert_eq!(session.list_entries().unwrap().len(), 1);
}

#[test]
fn test_add_folder_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ArchiveSession::new();
    session
        .open(dir.path().join("a.tar"), OpenMode::ReadWrite)
        .unwrap();

    assert!(matches!(
        session.add_folder(dir.path().join("nope")),
        Err(ArchiveError::NotADirectory(_))
    ));
}

#[test]
fn test_add_folder_skips_archive_inside_source() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "data.txt", b"data");
    let archive = dir.path().join("self.tar");

    let mut session = ArchiveSession::new();
    session.open(&archive, OpenMode::ReadWrite).unwrap();
    let summary = session.add_folder(dir.path()).unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!session.entry_exists("self.tar").unwrap());
}

#[test]
fn test_invalid_options_rejected_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut session =
        ArchiveSession::with_options(SessionOptions::default().with_block_size(0));

    assert!(matches!(
        session.open(dir.path().join("a.tar"), OpenMode::ReadWrite),
        Err(ArchiveError::InvalidOptions(_))
    ));
    assert!(!session.is_open());
}

#[test]
fn test_drop_finalizes_archive() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.tar");
    let source = write_file(dir.path(), "x.txt", b"hello");

    {
        let mut session = ArchiveSession::new();
        session.open(&archive, OpenMode::ReadWrite).unwrap();
        session.add_entries([&source]).unwrap();
    }

    let mut session = ArchiveSession::new();
    session.open(&archive, OpenMode::ReadOnly).unwrap();
    assert_eq!(
        session.get_entry("x.txt").unwrap().as_deref(),
        Some(&b"hello"[..])
    );
}

#[cfg(unix)]
#[test]
fn test_add_folder_stores_symlinked_files() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    fs::create_dir(&source).unwrap();
    let target = write_file(dir.path(), "real.txt", b"through a link");
    symlink(&target, source.join("linked.txt")).unwrap();
    symlink(dir.path().join("nowhere"), source.join("dangling")).unwrap();

    let mut session = ArchiveSession::new();
    session
        .open(dir.path().join("a.tar"), OpenMode::ReadWrite)
        .unwrap();
    let folder = session.add_folder(&source).unwrap();
    assert_eq!(folder.added, 1);
    assert_eq!(folder.skipped, 1);
    assert_eq!(
        session.get_entry("linked.txt").unwrap().as_deref(),
        Some(&b"through a link"[..])
    );

    // the flat add treats the same link the same way
    let flat = session.add_entries([source.join("linked.txt")]).unwrap();
    assert_eq!(flat.added, folder.added);
}

#[cfg(unix)]
#[test]
fn test_add_folder_traversal_error_keeps_earlier_entries() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    let locked = source.join("b_locked");
    fs::create_dir_all(&locked).unwrap();
    write_file(&source, "a.txt", b"first");
    write_file(&locked, "inner.txt", b"unreachable");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // privileged users read through mode bits, nothing to test then
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let archive = dir.path().join("a.tar");
    let mut session = ArchiveSession::new();
    session.open(&archive, OpenMode::ReadWrite).unwrap();
    let result = session.add_folder(&source);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(result, Err(ArchiveError::Walk(_))));
    session.close().unwrap();

    session.open(&archive, OpenMode::ReadOnly).unwrap();
    assert!(session.entry_exists("a.txt").unwrap());
    assert!(!session.entry_exists("b_locked/inner.txt").unwrap());
}
