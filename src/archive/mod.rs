//! Tar container plumbing: entry descriptors, the positioned writer, the
//! append-offset locator, header scanning and block transfers.
//!
//! Header encoding and decoding is delegated to the `tar` crate. What lives
//! here is the framing the crate does not expose on its own: writing headers
//! and data blocks separately, padding, and the end-of-data marker.

pub mod entry;
pub mod locate;
pub mod reader;
pub mod transfer;
pub mod writer;

pub use entry::{DEFAULT_MODE, EntryDescriptor, EntryKind, is_safe_archive_path};
pub use locate::locate_append_offset;
pub use writer::ArchiveWriter;

/// Size of a tar header and of the unit all payloads are padded to
pub const TAR_BLOCK: usize = 512;

/// Two zero blocks mark the end of the archive
pub(crate) const END_OF_DATA: [u8; TAR_BLOCK * 2] = [0u8; TAR_BLOCK * 2];

/// Round up to next 512-byte boundary
pub(crate) fn round_up_512(n: u64) -> u64 {
    if n == 0 { 0 } else { n.div_ceil(512) * 512 }
}
