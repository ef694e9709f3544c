//! Object pointers inside streamed payloads (`ReadObjectAny`) and the
//! collection classes built on them.

use std::collections::HashMap;

use crate::error::{Result, RootError};
use crate::rbuffer::{K_BYTE_COUNT_MASK, K_CLASS_MASK, K_MAP_OFFSET, K_NEW_CLASS_TAG, RBuffer};

/// Class names seen so far in one key payload.
///
/// ROOT records each new class at its tag offset measured from the start of
/// the key (header included), so offsets are shifted by the key length.
pub struct ClassTracker {
    displacement: usize,
    classes: HashMap<usize, String>,
}

impl ClassTracker {
    pub fn new(key_len: usize) -> Self {
        Self { displacement: key_len, classes: HashMap::new() }
    }

    fn register(&mut self, payload_pos: usize, class_name: String) {
        self.classes.insert(payload_pos + self.displacement + K_MAP_OFFSET, class_name);
    }

    fn lookup(&self, tag: u32) -> Option<&str> {
        self.classes.get(&(tag as usize)).map(String::as_str)
    }
}

/// Read an object pointer and hand the object body to `read`.
///
/// Returns `None` for null pointers and back-references to already streamed
/// objects; the reader is positioned after the object either way.
pub fn read_object_any<'a, T>(
    r: &mut RBuffer<'a>,
    tracker: &mut ClassTracker,
    read: impl FnOnce(&mut RBuffer<'a>, &mut ClassTracker, &str) -> Result<T>,
) -> Result<Option<T>> {
    let beg = r.pos();
    let first = r.read_u32()?;

    let (tag, tag_pos, end) = if first & K_BYTE_COUNT_MASK != 0 && first != K_NEW_CLASS_TAG {
        let tag_pos = r.pos();
        let byte_count = (first & !K_BYTE_COUNT_MASK) as usize;
        (r.read_u32()?, tag_pos, Some(beg + 4 + byte_count))
    } else {
        (first, beg, None)
    };

    if tag & K_CLASS_MASK == 0 {
        if tag != 0 {
            log::warn!("object back-reference {tag:#x} at offset {beg} read as null");
        }
        r.seek_end(end)?;
        return Ok(None);
    }

    let class_name = if tag == K_NEW_CLASS_TAG {
        let name = r.read_cstring()?;
        tracker.register(tag_pos, name.clone());
        name
    } else {
        let reference = tag & !K_CLASS_MASK;
        tracker
            .lookup(reference)
            .map(str::to_string)
            .ok_or_else(|| {
                RootError::Deserialization(format!("unknown class reference {reference} at offset {beg}"))
            })?
    };

    let obj = read(r, tracker, &class_name)?;
    r.seek_end(end)?;
    Ok(Some(obj))
}

/// Read a `TObjArray` whose elements are object pointers.
pub fn read_obj_array<'a, T>(
    r: &mut RBuffer<'a>,
    tracker: &mut ClassTracker,
    mut read: impl FnMut(&mut RBuffer<'a>, &mut ClassTracker, &str) -> Result<T>,
) -> Result<Vec<Option<T>>> {
    let (version, end) = r.read_version()?;
    if version > 2 {
        r.read_tobject()?;
    }
    if version > 1 {
        let _name = r.read_string()?;
    }
    let n = r.read_i32()?;
    let _lower_bound = r.read_i32()?;
    if n < 0 {
        return Err(RootError::Deserialization(format!("TObjArray with {n} entries")));
    }
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        out.push(read_object_any(r, tracker, &mut read)?);
    }
    r.seek_end(end)?;
    Ok(out)
}

/// Read a `TList`/`THashList`; each element is followed by its draw option.
pub fn read_list<'a, T>(
    r: &mut RBuffer<'a>,
    tracker: &mut ClassTracker,
    mut read: impl FnMut(&mut RBuffer<'a>, &mut ClassTracker, &str) -> Result<T>,
) -> Result<Vec<Option<T>>> {
    let (version, end) = r.read_version()?;
    if version > 3 {
        r.read_tobject()?;
        let _name = r.read_string()?;
    }
    let n = r.read_i32()?;
    let mut out = Vec::with_capacity(n.max(0) as usize);
    for _ in 0..n {
        out.push(read_object_any(r, tracker, &mut read)?);
        let _option = r.read_string()?;
    }
    r.seek_end(end)?;
    Ok(out)
}

/// Skip an object body whose class has no reader. Requires a byte count.
pub fn skip_body(r: &mut RBuffer, class_name: &str) -> Result<()> {
    r.skip_versioned().map_err(|e| {
        RootError::Deserialization(format!("cannot skip {class_name}: {e}"))
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a new-class object pointer with byte count around `body`.
    pub(crate) fn new_class_object(class: &str, body: &[u8]) -> Vec<u8> {
        let inner = 4 + class.len() + 1 + body.len();
        let mut b = Vec::new();
        b.extend_from_slice(&(K_BYTE_COUNT_MASK | inner as u32).to_be_bytes());
        b.extend_from_slice(&K_NEW_CLASS_TAG.to_be_bytes());
        b.extend_from_slice(class.as_bytes());
        b.push(0);
        b.extend_from_slice(body);
        b
    }

    /// Encode an object pointer that refers back to a class registered at `class_ref`.
    pub(crate) fn class_ref_object(class_ref: u32, body: &[u8]) -> Vec<u8> {
        let inner = 4 + body.len();
        let mut b = Vec::new();
        b.extend_from_slice(&(K_BYTE_COUNT_MASK | inner as u32).to_be_bytes());
        b.extend_from_slice(&(K_CLASS_MASK | class_ref).to_be_bytes());
        b.extend_from_slice(body);
        b
    }

    fn read_u32_body(r: &mut RBuffer, _: &mut ClassTracker, class: &str) -> Result<(String, u32)> {
        Ok((class.to_string(), r.read_u32()?))
    }

    #[test]
    fn new_class_then_reference() {
        let key_len = 50usize;
        let mut data = new_class_object("TArrayD", &7u32.to_be_bytes());
        // The class tag sits at payload offset 4.
        let class_ref = (4 + key_len + K_MAP_OFFSET) as u32;
        data.extend(class_ref_object(class_ref, &9u32.to_be_bytes()));
        data.extend_from_slice(&0u32.to_be_bytes());

        let mut r = RBuffer::new(&data);
        let mut tracker = ClassTracker::new(key_len);
        let a = read_object_any(&mut r, &mut tracker, read_u32_body).unwrap();
        let b = read_object_any(&mut r, &mut tracker, read_u32_body).unwrap();
        let c = read_object_any(&mut r, &mut tracker, read_u32_body).unwrap();
        assert_eq!(a, Some(("TArrayD".to_string(), 7)));
        assert_eq!(b, Some(("TArrayD".to_string(), 9)));
        assert_eq!(c, None);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn unknown_class_reference_fails() {
        let data = class_ref_object(1234, &[0u8; 4]);
        let mut r = RBuffer::new(&data);
        let mut tracker = ClassTracker::new(0);
        assert!(read_object_any(&mut r, &mut tracker, read_u32_body).is_err());
    }

    #[test]
    fn reader_lands_on_object_end() {
        // Reader consumes less than the byte count says.
        let data = new_class_object("TObjString", &[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut r = RBuffer::new(&data);
        let mut tracker = ClassTracker::new(0);
        read_object_any(&mut r, &mut tracker, read_u32_body).unwrap();
        assert_eq!(r.pos(), data.len());
    }
}
