use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use hfv_core::{Axis, Hist1D, Hist3D, HistBundle, HistSource};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hfv"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn assert_ok(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
}

fn s(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn counter(n: usize) -> Hist1D {
    let mut h = Hist1D::new("hNevGen", "", Axis::uniform(1, 0.0, 1.0).unwrap());
    for _ in 0..n {
        h.fill(0.5, 1.0);
    }
    h
}

#[test]
fn resources_prints_estimate() {
    let out = run(&["resources"]);
    assert_ok(&out, "resources");
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Input size: 23.34 MB"), "stdout={text}");
    assert!(text.contains("Expected running time: 27.569"), "stdout={text}");
    assert!(text.contains("Expected size: 46.68 TB"), "stdout={text}");
}

#[test]
fn config_file_overrides_target_events() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("hfv.yaml");
    std::fs::write(&cfg, "resources:\n  n_target_events: 2000000000.0\n").unwrap();
    let report = dir.path().join("resources.txt");

    let out = run(&["--config", &s(&cfg), "resources", "-o", &s(&report)]);
    assert_ok(&out, "resources --config");
    let text = std::fs::read_to_string(&report).unwrap();
    assert!(text.contains("Expected size: 93.36 TB"), "report={text}");
}

#[test]
fn config_dumps_defaults() {
    let out = run(&["config"]);
    assert_ok(&out, "config");
    let yaml: serde_yaml_ng::Value = serde_yaml_ng::from_slice(&out.stdout).unwrap();
    assert!(yaml.get("qa_mc_val").is_some());
    assert_eq!(yaml["nev_per_run"]["hist_name"].as_str(), Some("hNevGen"));
}

#[test]
fn store_hist_then_ls() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("AnalysisResults.json");
    let mut b = HistBundle::new("test");
    b.insert("hf-task-mc-validation-gen/hNevGen", counter(7));
    b.write_json(&input).unwrap();

    let out_dir = dir.path().join("stored");
    let out = run(&["store-hist", &s(&input), "-o", &s(&out_dir)]);
    assert_ok(&out, "store-hist");

    let stored_path = out_dir.join("hGenEv.json");
    let stored = HistBundle::read_json(&stored_path).unwrap();
    let h = stored.get_h1("hGenEv").unwrap();
    assert_eq!(h.name, "hGenEv");
    assert_eq!(h.entries, 7.0);

    let out = run(&["ls", &s(&stored_path)]);
    assert_ok(&out, "ls");
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "TH1\thGenEv");
}

#[test]
fn store_hist_without_counter_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.json");
    HistBundle::new("test").write_json(&input).unwrap();
    let out = run(&["store-hist", &s(&input), "-o", &s(dir.path())]);
    assert!(!out.status.success());
}

#[test]
fn nev_per_run_writes_bundle_and_figure() {
    let dir = tempfile::tempdir().unwrap();
    let runs = dir.path().join("outputs");
    std::fs::create_dir_all(&runs).unwrap();
    for (name, n) in [("AO2D_000001.json", 4), ("AO2D_000002.json", 6)] {
        let mut b = HistBundle::new("test");
        b.insert("hNevGen", counter(n));
        b.write_json(&runs.join(name)).unwrap();
    }

    let output = dir.path().join("result").join("nev.json");
    let out = run(&["nev-per-run", &s(&runs), &s(&output)]);
    assert_ok(&out, "nev-per-run");

    let bundle = HistBundle::read_json(&output).unwrap();
    let h = bundle.get_h1("output_hist").unwrap();
    assert_eq!(h.nbins(), 220);
    assert_eq!(h.bin_content(1), 4.0);
    assert_eq!(h.bin_content(2), 6.0);
    assert!(dir.path().join("result").join("nev_per_run.svg").exists());
}

#[test]
fn fit_mass_writes_result_json() {
    let dir = tempfile::tempdir().unwrap();
    let axis = Axis::uniform(64, 1.72, 2.04).unwrap();
    let contents: Vec<f64> = (1..=64)
        .map(|b| {
            let x = axis.center(b);
            2000.0 * (-0.5 * ((x - 1.868) / 0.012).powi(2)).exp() + 200.0 * (-2.0 * (x - 1.72)).exp()
        })
        .collect();
    let h = Hist1D::from_contents("hMass", axis.clone(), &contents).unwrap();
    let input = dir.path().join("mass.json");
    let mut b = HistBundle::new("test");
    b.insert("mass/hMass", h);
    b.write_json(&input).unwrap();

    let result = dir.path().join("fit.json");
    let figures = dir.path().join("figures");
    let out = run(&[
        "fit-mass",
        &s(&input),
        "--hist",
        "mass/hMass",
        "-o",
        &s(&result),
        "--figure-dir",
        &s(&figures),
    ]);
    assert_ok(&out, "fit-mass");

    let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&result).unwrap()).unwrap();
    let mean = v["mean"]["value"].as_f64().unwrap();
    assert!((mean - 1.868).abs() < 2e-3, "mean={mean}");
    assert!(v["signal"]["value"].as_f64().unwrap() > 0.0);
    assert!(figures.join("fit_hMass.svg").exists());
}

#[test]
fn fit_mass_missing_histogram_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mass.json");
    HistBundle::new("test").write_json(&input).unwrap();
    let out = run(&["fit-mass", &s(&input), "--hist", "hMass"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("hMass"));
}

#[test]
fn tracking_ratio_3d_from_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let axes = || {
        (
            Axis::uniform(10, 0.0, 100.0).unwrap(),
            Axis::uniform(4, 0.0, 8000.0).unwrap(),
            Axis::uniform(5, 0.0, 10.0).unwrap(),
        )
    };
    let (x, y, z) = axes();
    let mut num = Hist3D::new("its_tpc", "", x, y, z);
    let (x, y, z) = axes();
    let mut den = Hist3D::new("pos", "", x, y, z);
    for (c, o, pt) in [(5.0, 1000.0, 1.5), (35.0, 3000.0, 4.5), (75.0, 5000.0, 8.5)] {
        num.fill(c, o, pt, 1.0);
        den.fill(c, o, pt, 2.0);
    }
    let input = dir.path().join("occ.json");
    let mut b = HistBundle::new("test");
    b.insert("qa-efficiency_hf_occ/MC/occ_cent/reco/pos/its_tpc", num);
    b.insert("qa-efficiency_hf_occ/MC/occ_cent/gen/pos", den);
    b.write_json(&input).unwrap();

    let out_dir = dir.path().join("ratio");
    let out = run(&["tracking-ratio-3d", &s(&input), "-o", &s(&out_dir)]);
    assert_ok(&out, "tracking-ratio-3d");

    let ratio = HistBundle::read_json(&out_dir.join("ratio_output.json")).unwrap();
    let r = ratio.get_h3("RatioHistogram_pos").unwrap();
    let bin = |a: &Axis, v: f64| a.find_bin(v);
    let (bx, by, bz) = (bin(&r.x, 35.0), bin(&r.y, 3000.0), bin(&r.z, 4.5));
    assert_eq!(r.bin_content(bx, by, bz), 0.5);
    assert!(out_dir.join("RatioHistogram_projections.json").exists());
}

#[test]
fn unknown_subcommand_fails() {
    let out = run(&["frobnicate"]);
    assert!(!out.status.success());
}
