//! Integration tests against ROOT files in `tests/fixtures` (skipped when absent).

use std::path::PathBuf;

use hfv_core::HistSource;
use hfv_root::{RootError, RootFile};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

fn open_fixture(name: &str) -> Option<RootFile> {
    let path = fixture_path(name);
    if !path.exists() {
        eprintln!("Fixture not found: {:?}", path);
        return None;
    }
    Some(RootFile::open(&path).expect("failed to open ROOT file"))
}

#[test]
fn every_supported_object_decodes() {
    let Some(f) = open_fixture("simple_histos.root") else { return };
    for entry in f.walk().expect("walk failed") {
        if !hfv_root::objects::is_supported(&entry.info.class_name) {
            continue;
        }
        let h = f.get_any(&entry.path).unwrap_or_else(|e| panic!("{}: {e}", entry.path));
        assert_eq!(h.name(), entry.info.name, "{}", entry.path);
    }
}

#[test]
fn th1_contents_are_finite() {
    let Some(f) = open_fixture("simple_histos.root") else { return };
    for entry in f.walk().expect("walk failed") {
        if !entry.info.class_name.starts_with("TH1") {
            continue;
        }
        let h = f.get_h1(&entry.path).expect("TH1 read failed");
        assert!(h.contents().iter().all(|v| v.is_finite()));
        assert_eq!(h.raw_contents().len(), h.nbins() + 2);
    }
}

#[test]
fn step_container_axes_match_prototype() {
    let Some(f) = open_fixture("mc_efficiency.root") else { return };
    let steps = f
        .get_steps("hf-task-mc-efficiency/hCandidates")
        .expect("StepTHn read failed");
    assert!(steps.n_steps() > 0);
    let filled: Vec<_> = steps.steps.iter().flatten().collect();
    assert!(!filled.is_empty());
    let ndim = filled[0].ndim();
    assert!(filled.iter().all(|s| s.ndim() == ndim));
}

#[test]
fn missing_key_is_reported() {
    let Some(f) = open_fixture("simple_histos.root") else { return };
    assert!(matches!(f.get_object("no/such/hist"), Err(RootError::KeyNotFound(_))));
    assert!(matches!(f.get_any("no_such_hist"), Err(hfv_core::Error::NotFound(_))));
}
