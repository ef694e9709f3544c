//! TAxis streamer.

use hfv_core::Axis;

use super::refs::{ClassTracker, read_list, read_object_any, skip_body};
use crate::error::{Result, RootError};
use crate::rbuffer::RBuffer;

/// Read an embedded TAxis (version header first).
pub fn read_taxis(r: &mut RBuffer, tracker: &mut ClassTracker) -> Result<Axis> {
    let (_version, end) = r.read_version()?;
    let (_name, title) = r.read_tnamed()?;
    // TAttAxis
    r.skip_versioned()?;

    let nbins = r.read_i32()?;
    let xmin = r.read_f64()?;
    let xmax = r.read_f64()?;
    let n_edges = r.read_i32()?;
    let edges = if n_edges > 0 { r.read_array_f64(n_edges as usize)? } else { Vec::new() };
    let first = r.read_i32()?;
    let last = r.read_i32()?;
    let _bits2 = r.read_u16()?;
    let _time_display = r.read_bool()?;
    let _time_format = r.read_string()?;

    if nbins <= 0 {
        return Err(RootError::Deserialization(format!("TAxis '{title}' with {nbins} bins")));
    }
    let mut axis = if edges.is_empty() {
        Axis::uniform(nbins as usize, xmin, xmax)?
    } else {
        Axis::variable(edges)?
    }
    .with_title(title);

    // fLabels is optional decoration: a malformed list must not lose the axis.
    match read_labels(r, tracker) {
        Ok(labels) => {
            for (bin, label) in labels {
                axis.set_bin_label(bin, label);
            }
        }
        Err(e) => log::debug!("TAxis labels unreadable: {e}"),
    }

    if end.is_none() {
        return Err(RootError::Deserialization("TAxis without byte count".into()));
    }
    r.seek_end(end)?;
    axis.set_range(first as i64, last as i64);
    Ok(axis)
}

/// `fLabels`: a THashList of TObjString whose fUniqueID is the bin number.
fn read_labels(r: &mut RBuffer, tracker: &mut ClassTracker) -> Result<Vec<(usize, String)>> {
    let labels = read_object_any(r, tracker, |r, tracker, class| {
        if class == "THashList" || class == "TList" {
            read_list(r, tracker, |r, _, class| {
                if class == "TObjString" {
                    read_obj_string(r).map(Some)
                } else {
                    skip_body(r, class).map(|_| None)
                }
            })
        } else {
            skip_body(r, class).map(|_| Vec::new())
        }
    })?;
    Ok(labels.into_iter().flatten().flatten().flatten().collect())
}

fn read_obj_string(r: &mut RBuffer) -> Result<(usize, String)> {
    let (_version, end) = r.read_version()?;
    let (unique_id, _bits) = r.read_tobject()?;
    let s = r.read_string()?;
    r.seek_end(end)?;
    Ok((unique_id as usize, s))
}
