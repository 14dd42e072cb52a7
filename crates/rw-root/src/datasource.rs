//! Memory-mapped or owned data backing for ROOT file reads.

use std::ops::Deref;

/// How `RootFile::open_with` brings file bytes into memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Map the file read-only. Cheap for large files with many keys.
    #[default]
    Mmap,
    /// Read the whole file into an owned buffer. Use on filesystems where
    /// mapping is unreliable (some network mounts).
    Buffered,
}

/// Backing storage for a ROOT file.
pub enum DataSource {
    /// File bytes owned in a `Vec<u8>`.
    Owned(Vec<u8>),
    /// Memory-mapped file.
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

impl AsRef<[u8]> for DataSource {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self
    }
}
