//! THnSparseT streamer.
//!
//! Filled bins live in `THnSparseArrayChunk`s. Each chunk stores the bin
//! coordinates bit-packed (one field per axis, `floor(log2(nbins + 2)) + 1`
//! bits wide, least significant bit first) next to a content `TArray` and an
//! optional `TArrayD` of squared weights.

use hfv_core::{Axis, SparseHist};

use super::refs::{ClassTracker, read_obj_array, read_object_any, skip_body};
use super::taxis::read_taxis;
use crate::error::{Result, RootError};
use crate::rbuffer::{ArrayKind, RBuffer};

/// Read a `THnSparseT<...>` object body.
pub fn read_thnsparse(r: &mut RBuffer, tracker: &mut ClassTracker) -> Result<SparseHist> {
    let (_version, end) = r.read_version()?;
    let (_sparse_version, sparse_end) = r.read_version()?;

    // THnBase
    let (_base_version, base_end) = r.read_version()?;
    let (name, title) = r.read_tnamed()?;
    let ndim = r.read_i32()?;
    let axes: Vec<Axis> = read_obj_array(r, tracker, |r, tracker, class| {
        if class == "TAxis" {
            read_taxis(r, tracker)
        } else {
            Err(RootError::UnsupportedClass(format!("{class} in THnSparse axes")))
        }
    })?
    .into_iter()
    .collect::<Option<Vec<_>>>()
    .ok_or_else(|| RootError::Deserialization(format!("'{name}': null axis")))?;
    if axes.len() != ndim.max(0) as usize {
        return Err(RootError::Deserialization(format!(
            "'{name}': fNdimensions = {ndim} but {} axes",
            axes.len()
        )));
    }
    let entries = r.read_f64()?;
    // fTsumw, fTsumw2, fTsumwx, fTsumwx2
    r.seek_end(base_end)?;

    let _chunk_size = r.read_i32()?;
    let filled_bins = r.read_i64()?;
    let nbits: Vec<u32> = axes.iter().map(|a| coord_bits(a.nbins())).collect();
    let chunks = read_obj_array(r, tracker, |r, tracker, class| {
        if class == "THnSparseArrayChunk" {
            read_chunk(r, tracker, &nbits)
        } else {
            skip_body(r, class).map(|_| Vec::new())
        }
    })?;
    r.seek_end(sparse_end)?;
    r.seek_end(end)?;

    let mut h = SparseHist::new(name, title, axes);
    for (coords, w, w2) in chunks.into_iter().flatten().flatten() {
        h.add_to_bin(coords, w, w2);
    }
    h.entries = entries;
    if h.n_filled() as i64 != filled_bins {
        log::debug!("'{}': {} filled bins read, header says {filled_bins}", h.name, h.n_filled());
    }
    Ok(h)
}

/// Bits reserved for one coordinate of an axis with `nbins` bins.
fn coord_bits(nbins: usize) -> u32 {
    let n = nbins + 2;
    usize::BITS - n.leading_zeros()
}

type ChunkBin = (Vec<u32>, f64, f64);

fn read_chunk(r: &mut RBuffer, tracker: &mut ClassTracker, nbits: &[u32]) -> Result<Vec<ChunkBin>> {
    let (_version, end) = r.read_version()?;
    r.read_tobject()?;
    let single = r.read_i32()?;
    let coords_size = r.read_i32()?;
    if single <= 0 || coords_size < 0 {
        return Err(RootError::Deserialization(format!(
            "chunk coordinate sizes {single}/{coords_size}"
        )));
    }
    let _speedbump = r.read_u8()?;
    let coords = r.read_bytes(coords_size as usize)?;

    let content = read_object_any(r, tracker, read_array_object)?.unwrap_or_default();
    let sumw2 = read_object_any(r, tracker, read_array_object)?;
    r.seek_end(end)?;

    let single = single as usize;
    let n = coords.len() / single;
    if content.len() < n {
        return Err(RootError::Deserialization(format!(
            "chunk has {n} coordinates but {} contents",
            content.len()
        )));
    }
    let sumw2 = sumw2.filter(|s| s.len() >= n);
    let bins = (0..n)
        .map(|i| {
            let c = decode_compact_coords(&coords[i * single..(i + 1) * single], nbits);
            let w = content[i];
            let w2 = sumw2.as_ref().map(|s| s[i]).unwrap_or(w);
            (c, w, w2)
        })
        .collect();
    Ok(bins)
}

/// `TArray*` streamed through a pointer: no version header, `n` then values.
fn read_array_object(r: &mut RBuffer, _: &mut ClassTracker, class: &str) -> Result<Vec<f64>> {
    let kind = ArrayKind::from_class(class)
        .ok_or_else(|| RootError::UnsupportedClass(class.to_string()))?;
    r.read_tarray(kind)
}

/// Unpack one bit-packed coordinate tuple.
pub(crate) fn decode_compact_coords(bytes: &[u8], nbits: &[u32]) -> Vec<u32> {
    let mut offset = 0usize;
    nbits
        .iter()
        .map(|&width| {
            let mut value = 0u32;
            for b in 0..width as usize {
                let bit = offset + b;
                if bytes.get(bit / 8).is_some_and(|&byte| (byte >> (bit % 8)) & 1 == 1) {
                    value |= 1 << b;
                }
            }
            offset += width as usize;
            value
        })
        .collect()
}
