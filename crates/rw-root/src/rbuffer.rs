//! Big-endian cursor over streamed ROOT object bytes.

use crate::error::{Result, RootError};

/// Mask flagging a byte-count header on a streamed object.
pub const BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// `TObject::fBits` flag: a process-id slot follows the bits.
const IS_REFERENCED: u32 = 0x10;

/// Version header in front of a streamed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Class version.
    pub version: u16,
    /// Absolute end of the object, when a byte count was streamed.
    pub end: Option<usize>,
}

/// Reads ROOT's big-endian encoding from a byte slice.
///
/// Every read is bounds-checked and fails with
/// [`RootError::BufferUnderflow`] instead of panicking.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RBuffer<'a> {
    /// Reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset. Reads past the end still fail.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Advance by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(drop)
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let have = self.remaining();
        if n > have {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.take().map(u8::from_be_bytes)
    }

    /// Big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.take().map(u16::from_be_bytes)
    }

    /// Big-endian i16.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.take().map(i16::from_be_bytes)
    }

    /// Big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.take().map(u32::from_be_bytes)
    }

    /// Big-endian i32.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.take().map(i32::from_be_bytes)
    }

    /// Big-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.take().map(u64::from_be_bytes)
    }

    /// Big-endian f32.
    pub fn read_f32(&mut self) -> Result<f32> {
        self.take().map(f32::from_be_bytes)
    }

    /// Big-endian f64.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.take().map(f64::from_be_bytes)
    }

    /// ROOT string: a length byte, or 255 and a u32 length, then the bytes.
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn read_string(&mut self) -> Result<String> {
        let len = match self.read_u8()? {
            255 => self.read_u32()? as usize,
            short => short as usize,
        };
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Version header of the next object.
    ///
    /// With a byte count the header is `u32 (count | mask)` then `u16`
    /// version, and the count covers everything after the u32. Old-style
    /// objects carry the bare u16 version only.
    pub fn read_object_header(&mut self) -> Result<ObjectHeader> {
        let start = self.pos;
        let word = self.read_u32()?;
        if word & BYTE_COUNT_MASK == 0 {
            self.pos = start;
            let version = self.read_u16()?;
            return Ok(ObjectHeader { version, end: None });
        }
        let count = (word & !BYTE_COUNT_MASK) as usize;
        let version = self.read_u16()?;
        Ok(ObjectHeader {
            version,
            end: Some(start + 4 + count),
        })
    }

    /// Move to the end of an object opened with [`read_object_header`].
    ///
    /// Members appended by newer class versions are skipped this way. The
    /// cursor never moves backwards, and an end beyond the data is an error.
    ///
    /// [`read_object_header`]: RBuffer::read_object_header
    pub fn close_object(&mut self, header: &ObjectHeader) -> Result<()> {
        let Some(end) = header.end else {
            return Ok(());
        };
        if end > self.data.len() {
            return Err(RootError::Deserialization(format!(
                "object v{} ends at {} but only {} bytes are available",
                header.version,
                end,
                self.data.len()
            )));
        }
        self.pos = self.pos.max(end);
        Ok(())
    }

    /// Skip a whole streamed object whose members are not needed
    /// (attribute classes, empty lists).
    pub fn skip_object(&mut self) -> Result<()> {
        let header = self.read_object_header()?;
        self.close_object(&header)
    }

    /// Skip a `TObject` base: version, fUniqueID, fBits and, for
    /// referenced objects, the process id.
    pub fn skip_tobject(&mut self) -> Result<()> {
        self.skip(2 + 4)?;
        if self.read_u32()? & IS_REFERENCED != 0 {
            self.skip(2)?;
        }
        Ok(())
    }

    /// `TNamed` base: returns `(fName, fTitle)`.
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let header = self.read_object_header()?;
        self.skip_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        self.close_object(&header)?;
        Ok((name, title))
    }

    /// `n` big-endian doubles, as stored in `TArrayD` and `fXbins`.
    pub fn read_f64s(&mut self, n: usize) -> Result<Vec<f64>> {
        let raw = self.read_bytes(n.saturating_mul(8))?;
        Ok(raw
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                f64::from_be_bytes(b)
            })
            .collect())
    }

    /// `n` big-endian floats widened to f64, as stored in `TArrayF`.
    pub fn read_f32s_widened(&mut self, n: usize) -> Result<Vec<f64>> {
        let raw = self.read_bytes(n.saturating_mul(4))?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| f64::from(f32::from_be_bytes([c[0], c[1], c[2], c[3]])))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `TNamed("xaxis", "p_{T}")` with a byte count, as a TAxis starts.
    fn axis_tnamed(bits: u32) -> Vec<u8> {
        let mut body = vec![0x00, 0x01];
        body.extend_from_slice(&[0x00, 0x01, 0, 0, 0, 0]);
        body.extend_from_slice(&bits.to_be_bytes());
        if bits & IS_REFERENCED != 0 {
            body.extend_from_slice(&[0x00, 0x07]);
        }
        body.push(5);
        body.extend_from_slice(b"xaxis");
        body.push(5);
        body.extend_from_slice(b"p_{T}");

        let mut out = (body.len() as u32 | BYTE_COUNT_MASK).to_be_bytes().to_vec();
        out.extend(body);
        out
    }

    #[test]
    fn tnamed_of_an_axis() {
        let mut data = axis_tnamed(0x0300_0000);
        // fNbins of the axis that follows
        data.extend_from_slice(&25i32.to_be_bytes());
        let mut r = RBuffer::new(&data);
        let (name, title) = r.read_tnamed().unwrap();
        assert_eq!((name.as_str(), title.as_str()), ("xaxis", "p_{T}"));
        assert_eq!(r.read_i32().unwrap(), 25);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn referenced_tobject_skips_process_id() {
        let data = axis_tnamed(0x0300_0000 | IS_REFERENCED);
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_tnamed().unwrap().0, "xaxis");
        assert_eq!(r.pos(), data.len());
    }

    #[test]
    fn object_header_forms() {
        // TH1 v8 with 0x20 bytes after the count word
        let mut data = (0x20 | BYTE_COUNT_MASK).to_be_bytes().to_vec();
        data.extend_from_slice(&8u16.to_be_bytes());
        data.resize(0x24, 0);
        let mut r = RBuffer::new(&data);
        let h = r.read_object_header().unwrap();
        assert_eq!(h.version, 8);
        assert_eq!(h.end, Some(0x24));
        r.close_object(&h).unwrap();
        assert_eq!(r.remaining(), 0);

        // bare TAttFill v2 header
        let data = [0x00, 0x02, 0x00, 0x00, 0x03, 0xe9];
        let mut r = RBuffer::new(&data);
        let h = r.read_object_header().unwrap();
        assert_eq!((h.version, h.end), (2, None));
        assert_eq!(r.read_i16().unwrap(), 0);
        assert_eq!(r.read_i16().unwrap(), 1001);
    }

    #[test]
    fn close_object_is_forward_only_and_bounded() {
        let data = [0u8; 12];
        let mut r = RBuffer::new(&data);
        r.skip(8).unwrap();
        let behind = ObjectHeader {
            version: 1,
            end: Some(4),
        };
        r.close_object(&behind).unwrap();
        assert_eq!(r.pos(), 8);

        let past = ObjectHeader {
            version: 1,
            end: Some(40),
        };
        assert!(matches!(
            r.close_object(&past),
            Err(RootError::Deserialization(_))
        ));
    }

    #[test]
    fn cell_arrays() {
        let cells = [0.0, 1.25, -3.5];
        let mut data: Vec<u8> = cells.iter().flat_map(|v: &f64| v.to_be_bytes()).collect();
        data.extend(cells.iter().flat_map(|&v| (v as f32).to_be_bytes()));
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_f64s(3).unwrap(), cells);
        assert_eq!(r.read_f32s_widened(3).unwrap(), cells);
        assert!(r.read_f64s(0).unwrap().is_empty());
    }

    #[test]
    fn short_cell_array_underflows() {
        let data = [0u8; 20];
        let mut r = RBuffer::new(&data);
        r.skip(4).unwrap();
        match r.read_f64s(3) {
            Err(RootError::BufferUnderflow { offset, need, have }) => {
                assert_eq!((offset, need, have), (4, 24, 16));
            }
            other => panic!("expected underflow, got {:?}", other),
        }
        assert_eq!(r.pos(), 4);
    }

    #[test]
    fn long_title_uses_wide_length() {
        let title = "w".repeat(300);
        let mut data = vec![255u8];
        data.extend_from_slice(&300u32.to_be_bytes());
        data.extend_from_slice(title.as_bytes());
        data.push(0);
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_string().unwrap(), title);
        assert_eq!(r.read_string().unwrap(), "");
    }
}
