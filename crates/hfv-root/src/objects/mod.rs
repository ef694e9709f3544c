//! Streamer dispatch for the histogram classes.

pub mod refs;
mod stepthn;
mod taxis;
mod th1;
mod thnsparse;

use hfv_core::AnyHist;

use crate::error::{Result, RootError};
use crate::rbuffer::RBuffer;
use refs::ClassTracker;

/// Whether objects of `class_name` can be decoded.
pub fn is_supported(class_name: &str) -> bool {
    class_name.starts_with("TH1")
        || class_name.starts_with("TH2")
        || class_name.starts_with("TH3")
        || class_name.starts_with("THnSparse")
        || class_name.starts_with("StepTHn")
}

/// Decode a histogram from a decompressed key payload.
pub fn read_hist(payload: &[u8], class_name: &str, key_len: usize) -> Result<AnyHist> {
    let mut r = RBuffer::new(payload);
    let mut tracker = ClassTracker::new(key_len);
    let hist: AnyHist = if class_name.starts_with("TH1") {
        th1::read_th1(&mut r, &mut tracker, class_name)?.into()
    } else if class_name.starts_with("TH2") {
        th1::read_th2(&mut r, &mut tracker, class_name)?.into()
    } else if class_name.starts_with("TH3") {
        th1::read_th3(&mut r, &mut tracker, class_name)?.into()
    } else if class_name.starts_with("THnSparse") {
        thnsparse::read_thnsparse(&mut r, &mut tracker)?.into()
    } else if class_name.starts_with("StepTHn") {
        stepthn::read_stepthn(&mut r, &mut tracker)?.into()
    } else {
        return Err(RootError::UnsupportedClass(class_name.to_string()));
    };
    Ok(hist)
}
