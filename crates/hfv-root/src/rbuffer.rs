//! Big-endian cursor over ROOT streamer bytes.

use crate::error::{Result, RootError};

/// `kByteCountMask`: set on the leading u32 of objects carrying a byte count.
pub const K_BYTE_COUNT_MASK: u32 = 0x4000_0000;
/// `kClassMask`: marks a class tag (new class or back-reference).
pub const K_CLASS_MASK: u32 = 0x8000_0000;
/// `kNewClassTag`: a class name follows as a C string.
pub const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
/// `kMapOffset`: displacement ROOT adds to every recorded object/class offset.
pub const K_MAP_OFFSET: usize = 2;

/// Element type of a ROOT `TArray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// TArrayD
    F64,
    /// TArrayF
    F32,
    /// TArrayL64 / TArrayL
    I64,
    /// TArrayI
    I32,
    /// TArrayS
    I16,
    /// TArrayC
    I8,
}

impl ArrayKind {
    /// Array kind from a class name such as `TArrayD` or the suffix of `TH1F`.
    pub fn from_class(class_name: &str) -> Option<Self> {
        match class_name {
            "TArrayD" => Some(Self::F64),
            "TArrayF" => Some(Self::F32),
            "TArrayL" | "TArrayL64" => Some(Self::I64),
            "TArrayI" => Some(Self::I32),
            "TArrayS" => Some(Self::I16),
            "TArrayC" => Some(Self::I8),
            _ => None,
        }
    }

    /// Array kind from the type letter of a histogram class (`D`, `F`, `I`, `S`, `C`).
    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            'D' => Some(Self::F64),
            'F' => Some(Self::F32),
            'I' => Some(Self::I32),
            'S' => Some(Self::I16),
            'C' => Some(Self::I8),
            _ => None,
        }
    }
}

/// A cursor-based reader over a byte slice, using ROOT's big-endian conventions.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move the cursor to an absolute position (may not exceed the buffer).
    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: pos - self.pos.min(pos),
                have: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Read a `TString`: length byte (255 escapes to a u32 length) then bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let first = self.read_u8()?;
        let len = if first == 255 { self.read_u32()? as usize } else { first as usize };
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a NUL-terminated string (class names in object tags).
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let n = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            RootError::Deserialization(format!("unterminated C string at offset {}", self.pos))
        })?;
        let s = String::from_utf8_lossy(&rest[..n]).into_owned();
        self.pos += n + 1;
        Ok(s)
    }

    /// Read a streamer version header.
    ///
    /// Returns `(version, end_pos)`; `end_pos` is the absolute position where the
    /// object ends, present when the header carries a byte count.
    pub fn read_version(&mut self) -> Result<(u16, Option<usize>)> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw & K_BYTE_COUNT_MASK != 0 {
            let byte_count = (raw & !K_BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok((version, Some(start + 4 + byte_count)))
        } else {
            self.pos = start + 2;
            Ok(((raw >> 16) as u16, None))
        }
    }

    /// Skip a versioned object using its byte count.
    pub fn skip_versioned(&mut self) -> Result<()> {
        let (ver, end) = self.read_version()?;
        match end {
            Some(end) => self.set_pos(end),
            None => Err(RootError::Deserialization(format!(
                "cannot skip object (version {ver}) without byte count at offset {}",
                self.pos
            ))),
        }
    }

    /// Move to `end` when the reader stopped short of it.
    pub fn seek_end(&mut self, end: Option<usize>) -> Result<()> {
        match end {
            Some(end) if end != self.pos => self.set_pos(end),
            _ => Ok(()),
        }
    }

    /// Read a `TObject` header: returns `(fUniqueID, fBits)`.
    pub fn read_tobject(&mut self) -> Result<(u32, u32)> {
        let _ver = self.read_u16()?;
        let unique_id = self.read_u32()?;
        let bits = self.read_u32()? | 0x0100_0000;
        if bits & 0x0000_0010 != 0 {
            // kIsReferenced: process id follows
            self.skip(2)?;
        }
        Ok((unique_id, bits))
    }

    /// Read a `TNamed`: returns `(fName, fTitle)`.
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let (_ver, end) = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        self.seek_end(end)?;
        Ok((name, title))
    }

    pub fn read_array_f64(&mut self, n: usize) -> Result<Vec<f64>> {
        self.read_values(n, ArrayKind::F64)
    }

    /// Read `n` values of `kind`, widened to f64.
    pub fn read_values(&mut self, n: usize, kind: ArrayKind) -> Result<Vec<f64>> {
        let width = match kind {
            ArrayKind::F64 | ArrayKind::I64 => 8,
            ArrayKind::F32 | ArrayKind::I32 => 4,
            ArrayKind::I16 => 2,
            ArrayKind::I8 => 1,
        };
        let bytes = self.read_bytes(n.checked_mul(width).ok_or_else(|| {
            RootError::Deserialization(format!("array length {n} overflows"))
        })?)?;
        let out = match kind {
            ArrayKind::F64 => bytes
                .chunks_exact(8)
                .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
            ArrayKind::I64 => bytes
                .chunks_exact(8)
                .map(|c| i64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f64)
                .collect(),
            ArrayKind::F32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            ArrayKind::I32 => bytes
                .chunks_exact(4)
                .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            ArrayKind::I16 => {
                bytes.chunks_exact(2).map(|c| i16::from_be_bytes([c[0], c[1]]) as f64).collect()
            }
            ArrayKind::I8 => bytes.iter().map(|&b| b as i8 as f64).collect(),
        };
        Ok(out)
    }

    /// Read a `TArray` body: `n` (i32) followed by `n` values.
    pub fn read_tarray(&mut self, kind: ArrayKind) -> Result<Vec<f64>> {
        let n = self.read_i32()?;
        if n < 0 {
            return Err(RootError::Deserialization(format!("negative TArray length {n}")));
        }
        self.read_values(n as usize, kind)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let b = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(b);
        Ok(out)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.saturating_add(n) > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.data.len().saturating_sub(self.pos),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_primitives() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18];
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_u32().unwrap(), 0x0102_0304);
        assert!((r.read_f64().unwrap() - std::f64::consts::PI).abs() < 1e-15);
        assert!(matches!(r.read_u8(), Err(RootError::BufferUnderflow { .. })));
    }

    #[test]
    fn read_strings() {
        let data = [3, b'a', b'b', b'c', b'T', b'H', b'1', b'F', 0, 7];
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_string().unwrap(), "abc");
        assert_eq!(r.read_cstring().unwrap(), "TH1F");
        assert_eq!(r.read_u8().unwrap(), 7);
    }

    #[test]
    fn read_version_with_bytecount() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x4000_0010u32.to_be_bytes());
        data.extend_from_slice(&3u16.to_be_bytes());
        data.extend_from_slice(&[0u8; 20]);
        let mut r = RBuffer::new(&data);
        let (ver, end) = r.read_version().unwrap();
        assert_eq!(ver, 3);
        assert_eq!(end, Some(20));
        r.seek_end(end).unwrap();
        assert_eq!(r.pos(), 20);
    }

    #[test]
    fn read_version_without_bytecount() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u16.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x00]);
        let mut r = RBuffer::new(&data);
        let (ver, end) = r.read_version().unwrap();
        assert_eq!(ver, 5);
        assert!(end.is_none());
        assert_eq!(r.pos(), 2);
    }

    #[test]
    fn read_typed_arrays() {
        let mut data = Vec::new();
        data.extend_from_slice(&2i32.to_be_bytes());
        data.extend_from_slice(&1.5f32.to_be_bytes());
        data.extend_from_slice(&(-2.0f32).to_be_bytes());
        data.extend_from_slice(&3i32.to_be_bytes());
        data.extend_from_slice(&[0xff, 0x01, 0x02]);
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_tarray(ArrayKind::F32).unwrap(), vec![1.5, -2.0]);
        assert_eq!(r.read_tarray(ArrayKind::I8).unwrap(), vec![-1.0, 1.0, 2.0]);
        assert_eq!(ArrayKind::from_class("TArrayL64"), Some(ArrayKind::I64));
        assert_eq!(ArrayKind::from_suffix('S'), Some(ArrayKind::I16));
    }
}
