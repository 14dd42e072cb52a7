//! TDirectory parsing and key-list navigation.

use crate::error::{Result, RootError};
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// Directory streamer versions above this use 64-bit seek pointers.
pub const LARGE_DIRECTORY_VERSION: u16 = 1000;

/// Seek fields of a TDirectory streamer.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryHeader {
    /// Number of bytes of the key list record.
    pub nbytes_keys: u32,
    /// Offset of the key list record.
    pub seek_keys: u64,
}

impl DirectoryHeader {
    /// Read a TDirectory streamer at the current position.
    pub fn read(r: &mut RBuffer) -> Result<Self> {
        let version = r.read_u16()?;
        let _datime_c = r.read_u32()?;
        let _datime_m = r.read_u32()?;
        let nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;

        let seek_keys = if version > LARGE_DIRECTORY_VERSION {
            let _seek_dir = r.read_u64()?;
            let _seek_parent = r.read_u64()?;
            r.read_u64()?
        } else {
            let _seek_dir = r.read_u32()?;
            let _seek_parent = r.read_u32()?;
            r.read_u32()? as u64
        };

        Ok(Self {
            nbytes_keys,
            seek_keys,
        })
    }
}

/// A parsed TDirectory: an ordered list of TKeys.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list from the file at `seek_keys`.
    ///
    /// The key list starts with a TKey header for the list itself, then
    /// a u32 `nkeys`, followed by `nkeys` TKey records.
    pub fn read_key_list(file_data: &[u8], header: DirectoryHeader) -> Result<Self> {
        if header.seek_keys == 0 {
            return Ok(Directory::default());
        }
        let seek = usize::try_from(header.seek_keys).map_err(|_| {
            RootError::Deserialization(format!("seek_keys too large: {}", header.seek_keys))
        })?;
        if seek >= file_data.len() {
            return Err(RootError::Deserialization(format!(
                "key list offset {} past end of file ({} bytes)",
                seek,
                file_data.len()
            )));
        }

        let mut r = RBuffer::new(file_data);
        r.set_pos(seek);

        // The key list is itself stored behind a TKey header.
        let _list_key = Key::read(&mut r)?;

        let nkeys = r.read_u32()? as usize;
        let mut keys = Vec::with_capacity(nkeys.min(4096));
        for _ in 0..nkeys {
            keys.push(Key::read(&mut r)?);
        }

        log::trace!("read {} keys at offset {}", keys.len(), seek);
        Ok(Directory { keys })
    }

    /// Read a directory from the decompressed payload of a TDirectoryFile key.
    pub fn read_from_payload(payload: &[u8], file_data: &[u8]) -> Result<Self> {
        let mut r = RBuffer::new(payload);
        let header = DirectoryHeader::read(&mut r)?;
        Self::read_key_list(file_data, header)
    }

    /// Access the list of keys.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Find a key by name (returns the last cycle, i.e. highest version).
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}
