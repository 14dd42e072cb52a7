//! Minimal ROOT file writer for weight histograms.
//!
//! Produces small-format files (32-bit seek pointers) holding TH1D/TH2D/TH3D
//! objects, optionally inside nested TDirectoryFile directories. Only what
//! [`RootFile`](crate::RootFile) and ROOT itself need to locate and stream
//! the histograms is written; streamer info and free-segment records are
//! omitted.
//!
//! Layout:
//! ```text
//! 0      file header ("root", fBEGIN, fEND, fNbytesName, ...)
//! 100    TKey(TFile) + TNamed strings     <- fNbytesName bytes
//!        top TDirectory streamer
//!        objects, sub-directory records, key lists (depth first)
//! ```

use std::path::Path;

use crate::compression::Compression;
use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::objects;
use crate::wbuffer::WBuffer;

/// Offset of the first record.
const BEGIN: usize = 100;
/// Format version written to the header (ROOT 6.22, small file).
const FILE_VERSION: u32 = 62206;
const DIRECTORY_VERSION: u16 = 5;
const KEY_VERSION: u16 = 4;
/// 2024-01-01 00:00:00 in ROOT's packed TDatime encoding.
const FIXED_DATIME: u32 = (29 << 26) | (1 << 22) | (1 << 17);
/// Fixed part of a small TKey header (before the three strings).
const KEY_FIXED_LEN: usize = 26;

// Field offsets inside a small TDirectory streamer.
const DIR_NBYTES_KEYS_AT: usize = 10;
const DIR_SEEK_KEYS_AT: usize = 26;

#[derive(Debug, Default)]
struct DirNode {
    name: String,
    histograms: Vec<Histogram>,
    subdirs: Vec<DirNode>,
}

impl DirNode {
    fn child(&mut self, name: &str) -> &mut DirNode {
        let idx = match self.subdirs.iter().position(|d| d.name == name) {
            Some(idx) => idx,
            None => {
                self.subdirs.push(DirNode {
                    name: name.to_string(),
                    ..DirNode::default()
                });
                self.subdirs.len() - 1
            }
        };
        &mut self.subdirs[idx]
    }
}

/// Builds a ROOT file holding histograms.
///
/// ```
/// use rw_root::{Axis, Histogram, RootFile, RootWriter};
///
/// let mut h = Histogram::new_1d("sf", Axis::uniform(4, 0.0, 4.0).unwrap());
/// h.set_content_at(2.5, 0.0, 0.0, 1.1);
///
/// let mut w = RootWriter::new();
/// w.add_histogram("electrons", h).unwrap();
/// let bytes = w.to_bytes().unwrap();
///
/// let f = RootFile::from_bytes(bytes, "sf.root".into()).unwrap();
/// assert_eq!(f.get_histogram("electrons/sf").unwrap().content_at(2.5, 0.0, 0.0), 1.1);
/// ```
#[derive(Debug, Default)]
pub struct RootWriter {
    root: DirNode,
    compression: Compression,
}

impl RootWriter {
    /// Empty file with default (zlib) compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose payload compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Add `h` under `dir_path` (empty for the top directory). The key name
    /// is the histogram's name.
    pub fn add_histogram(&mut self, dir_path: &str, h: Histogram) -> Result<&mut Self> {
        validate_key_name(h.name())?;
        let mut node = &mut self.root;
        for part in dir_path.split('/').filter(|s| !s.is_empty()) {
            validate_key_name(part)?;
            node = node.child(part);
        }
        if node.histograms.iter().any(|o| o.name() == h.name()) {
            return Err(RootError::InvalidInput(format!(
                "duplicate histogram '{}' in '{}'",
                h.name(),
                dir_path
            )));
        }
        node.histograms.push(h);
        Ok(self)
    }

    /// Serialize the whole file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = WBuffer::new();

        // File header; fEND and fNbytesName are patched at the end.
        w.write_bytes(crate::file::ROOT_MAGIC);
        w.write_u32(FILE_VERSION);
        w.write_u32(BEGIN as u32);
        w.write_u32(0); // fEND
        w.write_u32(0); // fSeekFree
        w.write_u32(0); // fNbytesFree
        w.write_u32(0); // nfree
        w.write_u32(0); // fNbytesName
        w.write_u8(4); // fUnits
        w.write_u32(self.compression.setting());
        w.write_u32(0); // fSeekInfo
        w.write_u32(0); // fNbytesInfo
        w.write_u16(1); // fUUID version
        w.write_bytes(&[0u8; 16]);
        w.write_bytes(&vec![0u8; BEGIN - w.len()]);

        // Name record: TKey(TFile) followed by the file's TNamed strings.
        let file_name = "weights";
        let key_len = key_header_len("TFile", file_name, "");
        let name_key = KeyHeader::new("TFile", file_name, "", 0, 0, key_len, BEGIN, 0);
        write_key_header(&mut w, &name_key)?;
        w.write_string(file_name);
        w.write_string("");
        let nbytes_name = w.len() - BEGIN;

        let top_dir_at = w.len();
        write_directory_streamer(&mut w, nbytes_name, BEGIN, 0);
        let record_len = w.len() - BEGIN;
        w.patch_u32(BEGIN, to_u32(record_len)?);
        w.patch_u32(BEGIN + 6, to_u32(record_len - key_len)?);

        let (seek_keys, nbytes_keys) = self.write_directory(&mut w, &self.root, BEGIN)?;
        w.patch_u32(top_dir_at + DIR_NBYTES_KEYS_AT, to_u32(nbytes_keys)?);
        w.patch_u32(top_dir_at + DIR_SEEK_KEYS_AT, to_u32(seek_keys)?);

        let end = to_u32(w.len())?;
        w.patch_u32(12, end);
        w.patch_u32(28, to_u32(nbytes_name)?);

        Ok(w.into_inner())
    }

    /// Serialize and write the file to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::debug!("wrote ROOT file {}", path.as_ref().display());
        Ok(())
    }

    /// Write `node`'s objects, sub-directories and key list. Returns the
    /// key list's `(seek, n_bytes)`.
    fn write_directory(
        &self,
        w: &mut WBuffer,
        node: &DirNode,
        seek_dir: usize,
    ) -> Result<(usize, usize)> {
        let mut headers: Vec<KeyHeader> = Vec::new();

        for h in &node.histograms {
            let (class_name, raw) = objects::write_histogram(h);
            let stored = self.compression.compress(&raw)?;
            let key_len = key_header_len(class_name, h.name(), h.title());
            let header = KeyHeader::new(
                class_name,
                h.name(),
                h.title(),
                key_len + stored.len(),
                raw.len(),
                key_len,
                w.len(),
                seek_dir,
            );
            write_key_header(w, &header)?;
            w.write_bytes(&stored);
            headers.push(header);
        }

        for sub in &node.subdirs {
            let key_len = key_header_len("TDirectoryFile", &sub.name, &sub.name);
            let seek_key = w.len();
            let payload_at = seek_key + key_len;

            // Directory records are never compressed so their seek fields can be patched.
            let mut payload = WBuffer::new();
            write_directory_streamer(&mut payload, key_len, seek_key, seek_dir);
            let payload = payload.into_inner();

            let header = KeyHeader::new(
                "TDirectoryFile",
                &sub.name,
                &sub.name,
                key_len + payload.len(),
                payload.len(),
                key_len,
                seek_key,
                seek_dir,
            );
            write_key_header(w, &header)?;
            w.write_bytes(&payload);

            let (sub_seek_keys, sub_nbytes_keys) = self.write_directory(w, sub, seek_key)?;
            w.patch_u32(payload_at + DIR_NBYTES_KEYS_AT, to_u32(sub_nbytes_keys)?);
            w.patch_u32(payload_at + DIR_SEEK_KEYS_AT, to_u32(sub_seek_keys)?);
            headers.push(header);
        }

        // Key list: its own TKey header, nkeys, then every child's header.
        let mut list = WBuffer::new();
        list.write_u32(to_u32(headers.len())?);
        for header in &headers {
            write_key_header(&mut list, header)?;
        }
        let list = list.into_inner();

        let class_name = if seek_dir == BEGIN {
            "TFile"
        } else {
            "TDirectoryFile"
        };
        let key_len = key_header_len(class_name, &node.name, "");
        let seek_keys = w.len();
        let list_header = KeyHeader::new(
            class_name,
            &node.name,
            "",
            key_len + list.len(),
            list.len(),
            key_len,
            seek_keys,
            seek_dir,
        );
        write_key_header(w, &list_header)?;
        w.write_bytes(&list);

        Ok((seek_keys, key_len + list.len()))
    }
}

/// Fields of a TKey header as written.
#[derive(Debug)]
struct KeyHeader {
    class_name: String,
    name: String,
    title: String,
    n_bytes: usize,
    obj_len: usize,
    key_len: usize,
    seek_key: usize,
    seek_pdir: usize,
}

impl KeyHeader {
    #[allow(clippy::too_many_arguments)]
    fn new(
        class_name: &str,
        name: &str,
        title: &str,
        n_bytes: usize,
        obj_len: usize,
        key_len: usize,
        seek_key: usize,
        seek_pdir: usize,
    ) -> Self {
        Self {
            class_name: class_name.to_string(),
            name: name.to_string(),
            title: title.to_string(),
            n_bytes,
            obj_len,
            key_len,
            seek_key,
            seek_pdir,
        }
    }
}

fn string_len(s: &str) -> usize {
    if s.len() < 255 {
        1 + s.len()
    } else {
        5 + s.len()
    }
}

fn key_header_len(class_name: &str, name: &str, title: &str) -> usize {
    KEY_FIXED_LEN + string_len(class_name) + string_len(name) + string_len(title)
}

fn write_key_header(w: &mut WBuffer, k: &KeyHeader) -> Result<()> {
    w.write_u32(to_u32(k.n_bytes)?);
    w.write_u16(KEY_VERSION);
    w.write_u32(to_u32(k.obj_len)?);
    w.write_u32(FIXED_DATIME);
    w.write_u16(u16::try_from(k.key_len).map_err(|_| {
        RootError::InvalidInput(format!("key header for '{}' too long", k.name))
    })?);
    w.write_u16(1); // cycle
    w.write_u32(to_u32(k.seek_key)?);
    w.write_u32(to_u32(k.seek_pdir)?);
    w.write_string(&k.class_name);
    w.write_string(&k.name);
    w.write_string(&k.title);
    Ok(())
}

/// Small TDirectory streamer; nbytes_keys and seek_keys are patched later.
fn write_directory_streamer(
    w: &mut WBuffer,
    nbytes_name: usize,
    seek_dir: usize,
    seek_parent: usize,
) {
    w.write_u16(DIRECTORY_VERSION);
    w.write_u32(FIXED_DATIME);
    w.write_u32(FIXED_DATIME);
    w.write_u32(0); // fNbytesKeys
    w.write_u32(nbytes_name as u32);
    w.write_u32(seek_dir as u32);
    w.write_u32(seek_parent as u32);
    w.write_u32(0); // fSeekKeys
    // fUUID
    w.write_u16(1);
    w.write_bytes(&[0u8; 16]);
}

fn validate_key_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(RootError::InvalidInput(format!(
            "invalid key name '{}'",
            name
        )));
    }
    Ok(())
}

fn to_u32(v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| {
        RootError::InvalidInput(format!("offset {} needs a large-format file", v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::Axis;
    use crate::rbuffer::RBuffer;

    #[test]
    fn header_fields_are_patched() {
        let mut w = RootWriter::new();
        w.add_histogram("", Histogram::new_1d("h", Axis::uniform(1, 0.0, 1.0).unwrap()))
            .unwrap();
        let bytes = w.to_bytes().unwrap();

        let mut r = RBuffer::new(&bytes);
        r.set_pos(8);
        assert_eq!(r.read_u32().unwrap() as usize, BEGIN);
        assert_eq!(r.read_u32().unwrap() as usize, bytes.len());
        r.set_pos(28);
        assert!(r.read_u32().unwrap() > 0);
    }

    #[test]
    fn key_names_are_validated() {
        let mut w = RootWriter::new();
        let h = Histogram::new_1d("a/b", Axis::uniform(1, 0.0, 1.0).unwrap());
        assert!(matches!(
            w.add_histogram("", h),
            Err(RootError::InvalidInput(_))
        ));

        let h = Histogram::new_1d("ok", Axis::uniform(1, 0.0, 1.0).unwrap());
        w.add_histogram("dir", h.clone()).unwrap();
        assert!(w.add_histogram("dir", h).is_err());
    }

    #[test]
    fn header_records_the_level_payloads_use() {
        let mut h = Histogram::new_1d("h", Axis::uniform(50, 0.0, 5.0).unwrap());
        h.set_bin_content(3, 2.0).unwrap();
        for (compression, setting) in [
            (Compression::None, 0),
            (Compression::Zlib(0), 101),
            (Compression::Zlib(7), 107),
            (Compression::Zlib(99), 109),
        ] {
            let mut w = RootWriter::new().with_compression(compression);
            w.add_histogram("", h.clone()).unwrap();
            let bytes = w.to_bytes().unwrap();

            let mut r = RBuffer::new(&bytes);
            // fCompress follows fUnits
            r.set_pos(33);
            assert_eq!(r.read_u32().unwrap(), setting, "{:?}", compression);

            let f = crate::RootFile::from_bytes(bytes, "c.root".into()).unwrap();
            assert_eq!(f.get_histogram("h").unwrap().bin_content(3), 2.0);
        }
    }
}
