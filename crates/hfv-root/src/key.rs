//! TKey records: the headers that locate objects inside a ROOT file.

use crate::error::Result;
use crate::rbuffer::RBuffer;

/// A parsed TKey record.
#[derive(Debug, Clone)]
pub struct Key {
    /// Compressed object size plus key header.
    pub n_bytes: u32,
    pub version: u16,
    /// Uncompressed object size.
    pub obj_len: u32,
    pub key_len: u16,
    pub cycle: u16,
    /// Absolute offset of the key in the file.
    pub seek_key: u64,
    pub class_name: String,
    pub name: String,
    pub title: String,
}

/// Public view of a key, as printed by `hfv ls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub name: String,
    pub class_name: String,
    pub cycle: u16,
}

impl From<&Key> for KeyInfo {
    fn from(key: &Key) -> Self {
        Self { name: key.name.clone(), class_name: key.class_name.clone(), cycle: key.cycle }
    }
}

impl Key {
    /// Read a TKey at the current position. Keys with version > 1000 (or any key
    /// in a large file) use 64-bit seek pointers.
    pub fn read(r: &mut RBuffer, is_large: bool) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let _datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let seek_key = if version > 1000 || is_large {
            let sk = r.read_u64()?;
            let _seek_pdir = r.read_u64()?;
            sk
        } else {
            let sk = r.read_u32()? as u64;
            let _seek_pdir = r.read_u32()?;
            sk
        };

        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let title = r.read_string()?;

        Ok(Key { n_bytes, version, obj_len, key_len, cycle, seek_key, class_name, name, title })
    }

    /// Whether the key points at a subdirectory.
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectoryFile" | "TDirectory")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Serialize a small-file TKey header the way ROOT writes it.
    pub(crate) fn encode_key(class: &str, name: &str, obj_len: u32, n_bytes: u32, seek: u32) -> Vec<u8> {
        let strings_len = 3 + class.len() + name.len();
        let key_len = (4 + 2 + 4 + 4 + 2 + 2 + 4 + 4 + strings_len) as u16;
        let mut b = Vec::new();
        b.extend_from_slice(&n_bytes.to_be_bytes());
        b.extend_from_slice(&4u16.to_be_bytes());
        b.extend_from_slice(&obj_len.to_be_bytes());
        b.extend_from_slice(&0u32.to_be_bytes());
        b.extend_from_slice(&key_len.to_be_bytes());
        b.extend_from_slice(&1u16.to_be_bytes());
        b.extend_from_slice(&seek.to_be_bytes());
        b.extend_from_slice(&100u32.to_be_bytes());
        for s in [class, name, ""] {
            b.push(s.len() as u8);
            b.extend_from_slice(s.as_bytes());
        }
        b
    }

    #[test]
    fn read_small_key() {
        let bytes = encode_key("TH1D", "hist_pt", 512, 300, 1000);
        let mut r = RBuffer::new(&bytes);
        let key = Key::read(&mut r, false).unwrap();
        assert_eq!(key.class_name, "TH1D");
        assert_eq!(key.name, "hist_pt");
        assert_eq!(key.obj_len, 512);
        assert_eq!(key.seek_key, 1000);
        assert_eq!(key.key_len as usize, bytes.len());
        assert_eq!(r.pos(), bytes.len());
        assert!(!key.is_directory());
    }
}
