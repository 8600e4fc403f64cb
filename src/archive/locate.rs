use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use super::round_up_512;

/// Find the offset right after the last complete entry of the archive at
/// `path`, i.e. where the end-of-data marker starts.
///
/// A missing or empty file yields 0. So does a file the codec cannot walk
/// to the end: an undecodable archive is treated as empty and appends start
/// from the beginning, overwriting it.
pub fn locate_append_offset(path: &Path) -> u64 {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("no readable archive at {} ({e}), appending at 0", path.display());
            return 0;
        }
    };

    match end_of_data(&file) {
        Ok(offset) => {
            debug!("end of data in {} at {offset}", path.display());
            offset
        }
        Err(e) => {
            warn!(
                "could not scan {} to its end ({e}); treating it as empty",
                path.display()
            );
            0
        }
    }
}

/// Walk every header and return the offset one past the last entry's
/// padded payload. Payloads are skipped by seeking, not read.
///
/// Seeking past the end of the stream does not fail, so every payload is
/// checked against the stream length. A truncated payload is an error.
pub(crate) fn end_of_data<R: Read + Seek>(mut reader: R) -> io::Result<u64> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut archive = tar::Archive::new(reader);
    let mut end = 0u64;

    for entry in archive.entries_with_seek()? {
        let entry = entry?;
        let stored = entry.header().entry_size()?;
        let data_end = entry.raw_file_position() + stored;
        if data_end > len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "entry {} ends at {data_end}, past the end of the archive at {len}",
                    String::from_utf8_lossy(&entry.path_bytes())
                ),
            ));
        }
        end = entry.raw_file_position() + round_up_512(stored);
    }

    Ok(end)
}
