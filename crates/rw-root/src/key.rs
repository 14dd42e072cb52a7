//! TKey records: the headers ROOT uses to locate objects in a file.

use crate::error::Result;
use crate::rbuffer::RBuffer;

/// Key versions above this store 64-bit seek pointers.
pub const LARGE_KEY_VERSION: u16 = 1000;

/// A parsed TKey header.
#[derive(Debug, Clone)]
pub struct Key {
    /// Bytes on disk: key header plus the stored (possibly compressed) object.
    pub n_bytes: u32,
    /// Key class version. Decides the seek pointer width.
    pub version: u16,
    /// Length of the object once decompressed.
    pub obj_len: u32,
    /// Length of this header.
    pub key_len: u16,
    /// Cycle number of the object within its directory.
    pub cycle: u16,
    /// Absolute offset of this key in the file.
    pub seek_key: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
}

impl Key {
    /// Read a TKey header at the cursor.
    ///
    /// The seek pointer width follows the key's own version, so keys in a
    /// large file that were written before it grew keep 32-bit seeks.
    pub fn read(r: &mut RBuffer) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        // fDatime
        r.skip(4)?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        // fSeekKey, then fSeekPdir which is not needed
        let seek_key = if version > LARGE_KEY_VERSION {
            let seek = r.read_u64()?;
            r.skip(8)?;
            seek
        } else {
            let seek = r.read_u32()?;
            r.skip(4)?;
            u64::from(seek)
        };

        Ok(Key {
            n_bytes,
            version,
            obj_len,
            key_len,
            cycle,
            seek_key,
            class_name: r.read_string()?,
            name: r.read_string()?,
            title: r.read_string()?,
        })
    }

    /// Whether the stored object is compressed: its stored size differs
    /// from its object length.
    pub fn is_compressed(&self) -> bool {
        let stored = (self.n_bytes as usize).saturating_sub(self.key_len as usize);
        self.obj_len as usize != stored
    }
}

/// A directory entry as returned by [`RootFile::list_keys`](crate::RootFile::list_keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Class name, e.g. `"TH2D"` or `"TDirectoryFile"`.
    pub class_name: String,
    /// Cycle number.
    pub cycle: u16,
}

impl KeyInfo {
    /// Listing entry for `key`.
    pub fn from_key(key: &Key) -> Self {
        Self {
            name: key.name.clone(),
            class_name: key.class_name.clone(),
            cycle: key.cycle,
        }
    }

    /// Whether the key holds a histogram class this crate can read.
    pub fn is_histogram(&self) -> bool {
        crate::objects::is_supported_histogram(&self.class_name)
    }

    /// Whether the key names a sub-directory.
    pub fn is_directory(&self) -> bool {
        is_directory_class(&self.class_name)
    }
}

/// Classes that hold a nested key list.
pub(crate) fn is_directory_class(class_name: &str) -> bool {
    matches!(class_name, "TDirectoryFile" | "TDirectory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wbuffer::WBuffer;

    fn key_bytes(version: u16, seek_key: u64) -> Vec<u8> {
        let mut w = WBuffer::new();
        w.write_u32(120);
        w.write_u16(version);
        w.write_u32(300);
        w.write_u32(0);
        w.write_u16(60);
        w.write_u16(3);
        if version > LARGE_KEY_VERSION {
            w.write_bytes(&seek_key.to_be_bytes());
            w.write_bytes(&100u64.to_be_bytes());
        } else {
            w.write_u32(seek_key as u32);
            w.write_u32(100);
        }
        w.write_string("TH1F");
        w.write_string("pileup");
        w.write_string("pileup ratio");
        w.into_inner()
    }

    #[test]
    fn seek_width_follows_key_version() {
        let small = key_bytes(4, 0x1234);
        let mut r = RBuffer::new(&small);
        let key = Key::read(&mut r).unwrap();
        assert_eq!(key.seek_key, 0x1234);
        assert_eq!(key.name, "pileup");
        assert_eq!(key.class_name, "TH1F");
        assert_eq!(r.remaining(), 0);

        let large = key_bytes(1004, 0x1_0000_0040);
        let mut r = RBuffer::new(&large);
        let key = Key::read(&mut r).unwrap();
        assert_eq!(key.seek_key, 0x1_0000_0040);
        assert_eq!(key.title, "pileup ratio");
        assert_eq!(key.cycle, 3);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn compression_is_read_from_lengths() {
        let bytes = key_bytes(4, 0);
        let mut r = RBuffer::new(&bytes);
        let key = Key::read(&mut r).unwrap();
        // 120 bytes on disk, 60 of them header, 300 once inflated
        assert!(key.is_compressed());
        let raw = Key {
            obj_len: 60,
            ..key
        };
        assert!(!raw.is_compressed());
    }
}
