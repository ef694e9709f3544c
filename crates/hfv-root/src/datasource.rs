//! Backing bytes of an open ROOT file.

use std::ops::Deref;

/// File bytes, either memory-mapped from disk or owned.
pub enum DataSource {
    /// Bytes handed in by the caller (`RootFile::from_bytes`).
    Owned(Vec<u8>),
    /// Read-only memory map of a file on disk.
    Mmap(memmap2::Mmap),
}

impl Deref for DataSource {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            DataSource::Owned(v) => v,
            DataSource::Mmap(m) => m,
        }
    }
}
