use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::ControlFlow;

use super::entry::EntryDescriptor;
use crate::error::{ArchiveError, Result};

/// Rewind a read descriptor to the first header. The codec only moves
/// forward, so every scan has to start from here.
pub fn rewind(mut file: &File) -> Result<()> {
    file.seek(SeekFrom::Start(0))
        .map_err(|e| ArchiveError::io("rewinding archive", e))?;
    Ok(())
}

/// Walk the headers of `reader` in archive order, handing each decoded
/// descriptor and its entry to `visit` until it breaks or the archive ends.
///
/// Entries whose payload `visit` leaves unread are skipped by seeking past
/// it. Any decode failure ends the scan with a codec error.
pub fn scan_entries<R, F>(reader: R, mut visit: F) -> Result<()>
where
    R: Read + Seek,
    F: FnMut(&EntryDescriptor, &mut tar::Entry<'_, R>) -> Result<ControlFlow<()>>,
{
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries_with_seek()
        .map_err(|e| ArchiveError::codec("starting header scan", e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ArchiveError::codec("reading next header", e))?;
        let descriptor = EntryDescriptor::from_entry(&entry);
        if visit(&descriptor, &mut entry)?.is_break() {
            break;
        }
    }

    Ok(())
}
