//! Big-endian writer mirroring [`RBuffer`](crate::rbuffer::RBuffer).

use crate::rbuffer::BYTE_COUNT_MASK;

/// Append-only buffer using ROOT's big-endian conventions.
#[derive(Debug, Default)]
pub struct WBuffer {
    data: Vec<u8>,
}

impl WBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume into the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes.
    pub fn write_bytes(&mut self, b: &[u8]) {
        self.data.extend_from_slice(b);
    }

    /// A single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    /// Big-endian u16.
    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Big-endian i16.
    pub fn write_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Big-endian u32.
    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Big-endian i32.
    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Big-endian f32.
    pub fn write_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Big-endian f64.
    pub fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Overwrite a u32 written earlier.
    pub fn patch_u32(&mut self, at: usize, v: u32) {
        self.data[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// ROOT string: one length byte, or 255 followed by a u32 length.
    pub fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        if bytes.len() < 255 {
            self.write_u8(bytes.len() as u8);
        } else {
            self.write_u8(255);
            self.write_u32(bytes.len() as u32);
        }
        self.write_bytes(bytes);
    }

    /// Stream an object body behind a `(byte count | mask, version)` header.
    pub fn write_versioned(&mut self, version: u16, body: impl FnOnce(&mut WBuffer)) {
        let start = self.data.len();
        self.write_u32(0);
        self.write_u16(version);
        body(self);
        let count = (self.data.len() - start - 4) as u32;
        self.patch_u32(start, count | BYTE_COUNT_MASK);
    }

    /// `TObject` header with no unique id and the usual on-heap bits.
    pub fn write_tobject(&mut self) {
        self.write_u16(1);
        self.write_u32(0);
        self.write_u32(0x0300_0000);
    }

    /// `TNamed`: TObject + name + title.
    pub fn write_tnamed(&mut self, name: &str, title: &str) {
        self.write_versioned(1, |w| {
            w.write_tobject();
            w.write_string(name);
            w.write_string(title);
        });
    }

    /// `TArrayD`: length then values.
    pub fn write_array_f64(&mut self, values: &[f64]) {
        self.write_u32(values.len() as u32);
        for &v in values {
            self.write_f64(v);
        }
    }
}
