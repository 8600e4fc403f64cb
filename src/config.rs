//! Session configuration.

use crate::error::{ArchiveError, Result};

/// Default transfer block size, matching the classic tar record size.
pub const DEFAULT_BLOCK_SIZE: usize = 10240;

/// Options that shape how a session moves bytes around.
///
/// None of these change what ends up in the archive: any positive block
/// size produces byte-identical results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Size of each block copied between the archive and a file or buffer
    pub block_size: usize,
    /// Restore the stored modification time on extracted files
    pub preserve_mtime: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            preserve_mtime: true,
        }
    }
}

impl SessionOptions {
    /// Set the transfer block size
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Enable or disable mtime restoration during extraction
    #[must_use]
    pub fn with_preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(ArchiveError::InvalidOptions(
                "block size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SessionOptions::default();
        assert_eq!(opts.block_size, 10240);
        assert!(opts.preserve_mtime);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let opts = SessionOptions::default().with_block_size(0);
        assert!(matches!(
            opts.validate(),
            Err(ArchiveError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_builder() {
        let opts = SessionOptions::default()
            .with_block_size(1)
            .with_preserve_mtime(false);
        assert_eq!(opts.block_size, 1);
        assert!(!opts.preserve_mtime);
    }
}
