//! StepTHnT streamer: one dense N-dimensional array per selection step.

use hfv_core::{Axis, SparseHist, StepHist};

use super::refs::{ClassTracker, read_object_any};
use super::thnsparse::read_thnsparse;
use crate::error::{Result, RootError};
use crate::rbuffer::{ArrayKind, RBuffer};

/// Read a `StepTHnT<...>` object body.
pub fn read_stepthn(r: &mut RBuffer, tracker: &mut ClassTracker) -> Result<StepHist> {
    let (_version, end) = r.read_version()?;
    let (_step_version, step_end) = r.read_version()?;
    let (name, title) = r.read_tnamed()?;
    let n_bins = r.read_i64()?;
    let n_vars = r.read_i32()?;
    let n_steps = r.read_i32()?;
    if n_steps < 0 || n_vars <= 0 || n_bins < 0 {
        return Err(RootError::Deserialization(format!(
            "'{name}': {n_steps} steps, {n_vars} variables, {n_bins} bins"
        )));
    }
    let values = read_step_arrays(r, tracker, n_steps as usize)?;
    let sumw2 = read_step_arrays(r, tracker, n_steps as usize)?;

    let prototype = read_object_any(r, tracker, |r, tracker, class| {
        if class.starts_with("THnSparse") {
            read_thnsparse(r, tracker)
        } else {
            Err(RootError::UnsupportedClass(format!("{class} as StepTHn prototype")))
        }
    })?
    .ok_or_else(|| RootError::Deserialization(format!("'{name}': no axis prototype")))?;
    r.seek_end(step_end)?;
    r.seek_end(end)?;

    let axes: Vec<Axis> = prototype.axes().iter().map(Axis::without_range).collect();
    if axes.len() != n_vars as usize {
        return Err(RootError::Deserialization(format!(
            "'{name}': {n_vars} variables, prototype has {} axes",
            axes.len()
        )));
    }
    let nbins: Vec<usize> = axes.iter().map(Axis::nbins).collect();
    let dense_len: usize = nbins.iter().product();

    let mut steps = Vec::with_capacity(values.len());
    for (i, step_values) in values.into_iter().enumerate() {
        let Some(step_values) = step_values else {
            steps.push(None);
            continue;
        };
        if step_values.len() != dense_len {
            return Err(RootError::Deserialization(format!(
                "'{name}' step {i}: {} values for {dense_len} bins",
                step_values.len()
            )));
        }
        let step_w2 = sumw2.get(i).and_then(Option::as_ref).filter(|w2| w2.len() == dense_len);
        let mut h = SparseHist::new(format!("{name}_step{i}"), title.clone(), axes.clone());
        for (idx, &w) in step_values.iter().enumerate() {
            if w == 0.0 {
                continue;
            }
            let w2 = step_w2.map(|s| s[idx]).unwrap_or(w);
            h.add_to_bin(dense_coords(idx, &nbins), w, w2);
        }
        h.entries = step_values.iter().sum();
        steps.push(Some(h));
    }

    Ok(StepHist { name, title, steps })
}

/// The per-step `TArray*` list: a versioned wrapper around `n_steps` pointers.
fn read_step_arrays(
    r: &mut RBuffer,
    tracker: &mut ClassTracker,
    n_steps: usize,
) -> Result<Vec<Option<Vec<f64>>>> {
    let (_version, end) = r.read_version()?;
    let mut out = Vec::with_capacity(n_steps);
    for _ in 0..n_steps {
        out.push(read_object_any(r, tracker, |r, _, class| {
            let kind = ArrayKind::from_class(class)
                .ok_or_else(|| RootError::UnsupportedClass(class.to_string()))?;
            r.read_tarray(kind)
        })?);
    }
    r.seek_end(end)?;
    Ok(out)
}

/// 1-based bin coordinates of dense index `idx` (axis 0 most significant).
pub(crate) fn dense_coords(mut idx: usize, nbins: &[usize]) -> Vec<u32> {
    let mut coords = vec![0u32; nbins.len()];
    for (c, &n) in coords.iter_mut().zip(nbins).rev() {
        *c = (idx % n + 1) as u32;
        idx /= n;
    }
    coords
}
