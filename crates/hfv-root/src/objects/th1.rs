//! TH1/TH2/TH3 streamers (D, F, I, S and C storage).

use hfv_core::{Axis, Hist1D, Hist2D, Hist3D};

use super::refs::ClassTracker;
use super::taxis::read_taxis;
use crate::error::{Result, RootError};
use crate::rbuffer::{ArrayKind, RBuffer};

/// Fields of the TH1 base shared by all dimensions.
struct Th1Base {
    name: String,
    title: String,
    ncells: usize,
    x: Axis,
    y: Axis,
    z: Axis,
    entries: f64,
    sumw2: Vec<f64>,
}

impl Th1Base {
    fn sumw2(&self) -> Option<Vec<f64>> {
        (!self.sumw2.is_empty()).then(|| self.sumw2.clone())
    }
}

fn read_th1_base(r: &mut RBuffer, tracker: &mut ClassTracker) -> Result<Th1Base> {
    let (version, end) = r.read_version()?;
    let (name, title) = r.read_tnamed()?;
    // TAttLine, TAttFill, TAttMarker
    for _ in 0..3 {
        r.skip_versioned()?;
    }

    let ncells = r.read_i32()?.max(0) as usize;
    let x = read_taxis(r, tracker)?;
    let y = read_taxis(r, tracker)?;
    let z = read_taxis(r, tracker)?;

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    let _tsumw = r.read_f64()?;
    let _tsumw2 = r.read_f64()?;
    let _tsumwx = r.read_f64()?;
    let _tsumwx2 = r.read_f64()?;
    if version >= 2 {
        let _maximum = r.read_f64()?;
        let _minimum = r.read_f64()?;
    }
    if version >= 3 {
        let _norm_factor = r.read_f64()?;
    }
    let _contour = r.read_tarray(ArrayKind::F64)?;
    let sumw2 = r.read_tarray(ArrayKind::F64)?;

    // fOption, fFunctions, fBuffer and later members are not needed.
    match end {
        Some(end) => r.set_pos(end)?,
        None => return Err(RootError::Deserialization(format!("TH1 '{name}' without byte count"))),
    }
    Ok(Th1Base { name, title, ncells, x, y, z, entries, sumw2 })
}

fn array_kind(class_name: &str) -> Result<ArrayKind> {
    class_name
        .chars()
        .last()
        .and_then(ArrayKind::from_suffix)
        .ok_or_else(|| RootError::UnsupportedClass(class_name.to_string()))
}

fn read_cells(r: &mut RBuffer, kind: ArrayKind, base: &Th1Base) -> Result<Vec<f64>> {
    let sumw = r.read_tarray(kind)?;
    if sumw.len() != base.ncells {
        return Err(RootError::Deserialization(format!(
            "'{}': {} cell values, fNcells = {}",
            base.name,
            sumw.len(),
            base.ncells
        )));
    }
    Ok(sumw)
}

/// TH1[DFISC]
pub fn read_th1(r: &mut RBuffer, tracker: &mut ClassTracker, class_name: &str) -> Result<Hist1D> {
    let kind = array_kind(class_name)?;
    let (_version, end) = r.read_version()?;
    let base = read_th1_base(r, tracker)?;
    let sumw = read_cells(r, kind, &base)?;
    r.seek_end(end)?;
    let sumw2 = base.sumw2();
    Ok(Hist1D::from_raw(base.name, base.title, base.x, sumw, sumw2, base.entries)?)
}

/// TH2[DFISC]
pub fn read_th2(r: &mut RBuffer, tracker: &mut ClassTracker, class_name: &str) -> Result<Hist2D> {
    let kind = array_kind(class_name)?;
    let (_version, end) = r.read_version()?;
    let (_th2_version, th2_end) = r.read_version()?;
    let base = read_th1_base(r, tracker)?;
    // fScalefactor, fTsumwy, fTsumwy2, fTsumwxy
    r.seek_end(th2_end)?;
    let sumw = read_cells(r, kind, &base)?;
    r.seek_end(end)?;
    let sumw2 = base.sumw2();
    Ok(Hist2D::from_raw(base.name, base.title, base.x, base.y, sumw, sumw2, base.entries)?)
}

/// TH3[DFISC]
pub fn read_th3(r: &mut RBuffer, tracker: &mut ClassTracker, class_name: &str) -> Result<Hist3D> {
    let kind = array_kind(class_name)?;
    let (_version, end) = r.read_version()?;
    let (_th3_version, th3_end) = r.read_version()?;
    let base = read_th1_base(r, tracker)?;
    // TAtt3D and the y/z moment sums
    r.seek_end(th3_end)?;
    let sumw = read_cells(r, kind, &base)?;
    r.seek_end(end)?;
    let sumw2 = base.sumw2();
    Ok(Hist3D::from_raw(
        base.name,
        base.title,
        base.x,
        base.y,
        base.z,
        sumw,
        sumw2,
        base.entries,
    )?)
}
