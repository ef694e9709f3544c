//! TDirectory key lists.

use crate::error::Result;
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// Seek information stored in a TDirectory streamer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirHeader {
    pub nbytes_keys: u32,
    pub seek_keys: u64,
}

impl DirHeader {
    /// Parse the TDirectory streamer at the reader position.
    pub(crate) fn read(r: &mut RBuffer) -> Result<Self> {
        let version = r.read_u16()?;
        let _datime_c = r.read_u32()?;
        let _datime_m = r.read_u32()?;
        let nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;
        let seek_keys = if version > 1000 {
            let _seek_dir = r.read_u64()?;
            let _seek_parent = r.read_u64()?;
            r.read_u64()?
        } else {
            let _seek_dir = r.read_u32()?;
            let _seek_parent = r.read_u32()?;
            r.read_u32()? as u64
        };
        Ok(Self { nbytes_keys, seek_keys })
    }
}

/// An ordered list of keys.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list at `seek_keys`: a TKey header for the list itself,
    /// `nkeys` (u32), then `nkeys` TKey records.
    pub fn read_key_list(file_data: &[u8], seek_keys: usize, is_large: bool) -> Result<Self> {
        let mut r = RBuffer::new(file_data);
        r.set_pos(seek_keys)?;
        let _list_key = Key::read(&mut r, is_large)?;
        let nkeys = r.read_u32()? as usize;
        let mut keys = Vec::with_capacity(nkeys.min(1 << 16));
        for _ in 0..nkeys {
            keys.push(Key::read(&mut r, is_large)?);
        }
        Ok(Directory { keys })
    }

    /// Read a subdirectory from the payload of its TDirectoryFile key.
    pub fn read_from_payload(payload: &[u8], file_data: &[u8], is_large: bool) -> Result<Self> {
        let mut r = RBuffer::new(payload);
        let header = DirHeader::read(&mut r)?;
        if header.seek_keys == 0 {
            return Ok(Directory::default());
        }
        Self::read_key_list(file_data, header.seek_keys as usize, is_large)
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Find a key by name, preferring the highest cycle.
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }

    /// Keys with only the highest cycle of each name, in file order.
    pub fn latest_keys(&self) -> Vec<&Key> {
        let mut out: Vec<&Key> = Vec::new();
        for k in &self.keys {
            match out.iter_mut().find(|o| o.name == k.name) {
                Some(o) if o.cycle < k.cycle => *o = k,
                Some(_) => {}
                None => out.push(k),
            }
        }
        out
    }
}
