/// Outcome of an add operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AddSummary {
    pub added: usize,
    /// Inputs that were not regular files
    pub skipped: usize,
    /// Files that could not be stored
    pub failed: usize,
    /// Payload bytes stored
    pub bytes: u64,
}

impl AddSummary {
    pub(crate) fn record_added(&mut self, bytes: u64) {
        self.added += 1;
        self.bytes += bytes;
    }
}

/// Outcome of an extraction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub extracted: usize,
    /// Entries filtered out or of a kind that is not extracted
    pub skipped: usize,
    /// Entries that could not be written to disk
    pub failed: usize,
    pub bytes: u64,
}

impl ExtractSummary {
    pub(crate) fn record_extracted(&mut self, bytes: u64) {
        self.extracted += 1;
        self.bytes += bytes;
    }
}
