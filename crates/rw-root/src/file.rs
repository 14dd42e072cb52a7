//! TFile header parsing and top-level ROOT file interface.

use std::fs;
use std::path::{Path, PathBuf};

use crate::compression::decompress;
use crate::datasource::{DataSource, ReadMode};
use crate::directory::{Directory, DirectoryHeader};
use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::key::{Key, KeyInfo, is_directory_class};
use crate::objects;
use crate::rbuffer::RBuffer;

/// ROOT file magic.
pub const ROOT_MAGIC: &[u8; 4] = b"root";

/// File format versions at or above this use 64-bit seek pointers.
pub const LARGE_FILE_VERSION: u32 = 1_000_000;

/// Smallest byte count that can hold a file header.
const MIN_FILE_LEN: usize = 64;

/// Parsed ROOT file header.
#[derive(Debug, Clone, Copy)]
struct FileHeader {
    /// Whether the file uses large (64-bit) seek pointers.
    is_large: bool,
    /// Seek fields of the top-level directory.
    top_dir: DirectoryHeader,
}

/// A ROOT file opened for reading histograms.
///
/// Dropping the value releases the mapping (or buffer) and the file handle.
pub struct RootFile {
    /// Raw file bytes (owned or memory-mapped).
    data: DataSource,
    /// Parsed header.
    header: FileHeader,
    /// Path for diagnostics.
    path: PathBuf,
}

impl std::fmt::Debug for RootFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootFile")
            .field("path", &self.path)
            .field("len", &self.data.len())
            .field("is_large", &self.header.is_large)
            .finish()
    }
}

impl RootFile {
    /// Open and parse a ROOT file from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ReadMode::Mmap)
    }

    /// Open and parse a ROOT file, choosing how its bytes are loaded.
    pub fn open_with(path: impl AsRef<Path>, mode: ReadMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match mode {
            ReadMode::Mmap => {
                let file = fs::File::open(&path)?;
                // SAFETY: the mapping is read-only; concurrent truncation of
                // the file by another process is outside what we support.
                let mmap = unsafe { memmap2::Mmap::map(&file)? };
                DataSource::Mmap(mmap)
            }
            ReadMode::Buffered => DataSource::Owned(fs::read(&path)?),
        };
        Self::from_datasource(data, path)
    }

    /// Parse a ROOT file from a byte vector.
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_datasource(DataSource::Owned(data), path)
    }

    fn from_datasource(data: DataSource, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_FILE_LEN || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }

        let header = Self::parse_header(&data)?;
        log::debug!(
            "opened ROOT file {} ({} bytes, large={})",
            path.display(),
            data.len(),
            header.is_large
        );
        Ok(Self { data, header, path })
    }

    /// Parse the file-level header and the embedded top directory.
    ///
    /// ROOT file header layout (small file, version < 1000000):
    /// ```text
    /// offset  size  field
    ///    0      4   magic "root"
    ///    4      4   fVersion
    ///    8      4   fBEGIN
    ///   12      4   fEND
    ///   16      4   fSeekFree
    ///   20      4   fNbytesFree
    ///   24      4   nfree
    ///   28      4   fNbytesName
    ///   32      1   fUnits
    ///   33      4   fCompress
    ///   37      4   fSeekInfo
    ///   41      4   fNbytesInfo
    ///   45     18   fUUID
    /// ```
    /// Large files widen fEND, fSeekFree and fSeekInfo to 8 bytes.
    ///
    /// The TDirectory streamer is located at `fBEGIN + fNbytesName`.
    fn parse_header(data: &[u8]) -> Result<FileHeader> {
        let mut r = RBuffer::new(data);
        r.skip(4)?;

        let version = r.read_u32()?;
        let is_large = version >= LARGE_FILE_VERSION;
        let begin = r.read_u32()? as usize;

        if is_large {
            let _end = r.read_u64()?;
            let _seek_free = r.read_u64()?;
        } else {
            let _end = r.read_u32()?;
            let _seek_free = r.read_u32()?;
        }
        let _nbytes_free = r.read_u32()?;
        let _nfree = r.read_u32()?;
        let nbytes_name = r.read_u32()? as usize;

        let dir_offset = begin.checked_add(nbytes_name).filter(|&o| o < data.len()).ok_or_else(
            || RootError::Deserialization("TDirectory offset past end of file".into()),
        )?;

        r.set_pos(dir_offset);
        let top_dir = DirectoryHeader::read(&mut r)?;

        Ok(FileHeader { is_large, top_dir })
    }

    /// Path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file bytes.
    pub fn file_data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the file uses 64-bit seek pointers.
    pub fn is_large(&self) -> bool {
        self.header.is_large
    }

    /// List all keys in the top-level directory.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        let dir = self.read_top_directory()?;
        Ok(dir.keys().iter().map(KeyInfo::from_key).collect())
    }

    /// List keys of a sub-directory given by its path (e.g. `"SR/weights"`).
    /// An empty path lists the top directory.
    pub fn list_keys_in(&self, dir_path: &str) -> Result<Vec<KeyInfo>> {
        let parts = split_path(dir_path);
        let dir = self.walk_directories(&parts, dir_path)?;
        Ok(dir.keys().iter().map(KeyInfo::from_key).collect())
    }

    /// Get a histogram by its full path (e.g. `"subdir/hist_name"`).
    pub fn get_histogram(&self, path: &str) -> Result<Histogram> {
        let parts = split_path(path);
        let Some((&name, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };

        let dir = self.walk_directories(dirs, path)?;
        let key = dir.find_key(name).ok_or_else(|| RootError::KeyNotFound(path.to_string()))?;

        log::trace!("reading {} '{}' (cycle {})", key.class_name, path, key.cycle);
        let payload = self.read_key_payload(key)?;
        objects::read_histogram(&payload, &key.class_name)
    }

    fn read_top_directory(&self) -> Result<Directory> {
        Directory::read_key_list(&self.data, self.header.top_dir)
    }

    /// Descend from the top directory through `parts`, each of which must be
    /// a directory key.
    fn walk_directories(&self, parts: &[&str], full_path: &str) -> Result<Directory> {
        let mut current = self.read_top_directory()?;
        for &part in parts {
            let key = current.find_key(part).ok_or_else(|| {
                RootError::KeyNotFound(format!("{} (in path {})", part, full_path))
            })?;

            if !is_directory_class(&key.class_name) {
                return Err(RootError::Deserialization(format!(
                    "'{}' is not a directory (class: {})",
                    part, key.class_name
                )));
            }

            let payload = self.read_key_payload(key)?;
            current = Directory::read_from_payload(&payload, &self.data)?;
        }
        Ok(current)
    }

    /// Read and decompress the payload of a TKey.
    pub(crate) fn read_key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        read_key_payload_from(&self.data, key)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Read and decompress a TKey payload from raw file bytes.
pub(crate) fn read_key_payload_from(data: &[u8], key: &Key) -> Result<Vec<u8>> {
    let seek = usize::try_from(key.seek_key).map_err(|_| {
        RootError::Deserialization(format!("seek offset too large: {}", key.seek_key))
    })?;
    let n_bytes = key.n_bytes as usize;
    let end = seek.checked_add(n_bytes).filter(|&e| e <= data.len()).ok_or(
        RootError::BufferUnderflow {
            offset: seek,
            need: n_bytes,
            have: data.len().saturating_sub(seek),
        },
    )?;

    let key_len = key.key_len as usize;
    if key_len > n_bytes {
        return Err(RootError::Deserialization(format!(
            "key '{}' header length {} exceeds record length {}",
            key.name, key_len, n_bytes
        )));
    }

    // Object data starts after the key header.
    let stored = &data[seek + key_len..end];
    if key.is_compressed() {
        decompress(stored, key.obj_len as usize)
    } else {
        Ok(stored.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_non_root_file() {
        let data = vec![0u8; 100];
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_too_small() {
        let data = b"root".to_vec();
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_directory_past_end() {
        let mut data = vec![0u8; 80];
        data[0..4].copy_from_slice(ROOT_MAGIC);
        data[4..8].copy_from_slice(&62206u32.to_be_bytes());
        // fBEGIN
        data[8..12].copy_from_slice(&100u32.to_be_bytes());
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::Deserialization(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RootFile::open("/definitely/not/here.root").unwrap_err();
        assert!(matches!(err, RootError::Io(_)));
    }

    #[test]
    fn split_path_ignores_empty_segments() {
        assert_eq!(split_path("/SR//weights/"), vec!["SR", "weights"]);
        assert!(split_path("").is_empty());
    }
}
