//! Analysis configuration.
//!
//! Each subcommand reads its constants (object paths, binning, palettes,
//! axis ranges) from one section of [`AnalysisConfig`]. The defaults are the
//! values the analyses were tuned with; a YAML file given with `--config`
//! overrides any subset of them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use hfv_fit::MassFitConfig;
use hfv_render::config::{VizConfig, resolve_config};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rendering overrides, merged onto the theme named by `viz.theme`.
    pub viz: Option<serde_yaml_ng::Value>,
    /// Mass fit used by `signal-vs-occupancy` and `fit-mass`.
    pub fit: MassFitConfig,
    pub mc_eff: McEffConfig,
    pub signal_occupancy: SignalOccupancyConfig,
    pub eff_occupancy: EffOccupancyConfig,
    pub eff_centrality: EffCentralityConfig,
    pub tracking_eff: TrackingEffConfig,
    pub tracking_ratio_3d: TrackingRatio3dConfig,
    pub compare_mc_eff: CompareMcEffConfig,
    pub compare_qa: CompareQaConfig,
    pub qa_mc_val: QaMcValConfig,
    pub compare_qa_mc_val: CompareQaMcValConfig,
    pub nev_per_run: NevPerRunConfig,
    pub resources: ResourcesConfig,
}

impl AnalysisConfig {
    /// Read a YAML file; missing sections and keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Rendering configuration with the `viz` overrides applied.
    pub fn viz_config(&self) -> Result<VizConfig> {
        match &self.viz {
            None => Ok(VizConfig::default()),
            Some(v) => {
                let yaml = serde_yaml_ng::to_string(v)?;
                Ok(resolve_config(Some(&yaml))?)
            }
        }
    }
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

const OCC_MARKERS: [i32; 10] = [20, 21, 22, 23, 33, 29, 34, 49, 47, 43];

/// A charm hadron selected by PDG code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pdg: i32,
    pub label: String,
}

/// A decay channel and its display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub label: String,
}

impl Channel {
    fn new(name: &str, label: &str) -> Self {
        Self { name: name.into(), label: label.into() }
    }
}

// ---------------------------------------------------------------------------
// mc-eff
// ---------------------------------------------------------------------------

/// Axes of the `hCandidates` step container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McEffAxes {
    pub pt: usize,
    pub pdg: usize,
    pub cos_pointing: usize,
    pub coll_assoc: usize,
    pub origin: usize,
}

impl Default for McEffAxes {
    fn default() -> Self {
        Self { pt: 0, pdg: 2, cos_pointing: 3, coll_assoc: 4, origin: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McEffConfig {
    pub task: String,
    pub object: String,
    pub particles: BTreeMap<String, Particle>,
    pub axes: McEffAxes,
    pub step_names: Vec<String>,
    pub step_colors: Vec<String>,
    pub pt_rebin: Vec<f64>,
    /// Steps divided by `reference_step`.
    pub eff_steps: Vec<usize>,
    pub reference_step: usize,
    /// First step made of reconstructed candidates (collision association is defined).
    pub first_reco_step: usize,
}

impl Default for McEffConfig {
    fn default() -> Self {
        let particles = [
            ("dplus", 411, "D^{#plus}"),
            ("dzero", 421, "D^{0}"),
            ("ds", 431, "D_{s}^{#plus}"),
            ("lc", 4122, "#Lambda_{c}^{#plus}"),
        ]
        .into_iter()
        .map(|(k, pdg, label)| (k.to_string(), Particle { pdg, label: label.into() }))
        .collect();
        Self {
            task: "hf-task-mc-efficiency".into(),
            object: "hCandidates".into(),
            particles,
            axes: McEffAxes::default(),
            step_names: strings(&[
                "kHFStepMC",
                "kHFStepMcInRapidity",
                "kHFStepAcceptance",
                "kHFStepTrackable",
                "kHFStepAcceptanceTrackable",
                "kHFStepTrackableCuts",
                "kHFStepTracked",
                "kHFStepTrackedCuts",
                "kHFStepTrackedSelected",
                "kHFStepTrackedDuplicates",
            ]),
            step_colors: strings(&[
                "kBlue+3", "kBlue+1", "kAzure+4", "kAzure+2", "kGreen+2", "kSpring-6", "kOrange+7",
                "kOrange+9", "kBlack", "kRed+1",
            ]),
            pt_rebin: vec![0.0, 1.0, 3.0, 5.0, 8.0, 12.0, 16.0, 50.0],
            eff_steps: vec![2, 4, 5, 6, 8, 9],
            reference_step: 1,
            first_reco_step: 6,
        }
    }
}

// ---------------------------------------------------------------------------
// signal-vs-occupancy
// ---------------------------------------------------------------------------

/// Axes of the flow sparse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowAxes {
    pub mass: usize,
    pub pt: usize,
    pub centrality: usize,
    pub sp: usize,
    pub occupancy: usize,
}

impl Default for FlowAxes {
    fn default() -> Self {
        Self { mass: 0, pt: 1, centrality: 2, sp: 3, occupancy: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalOccupancyConfig {
    pub task: String,
    pub task_ft0c: String,
    pub sparse: String,
    pub axes: FlowAxes,
    pub centrality_edges: Vec<f64>,
    pub occupancy_edges: Vec<f64>,
    /// Occupancy edges are multiplied by this with `--ft0c`.
    pub ft0c_occupancy_scale: f64,
    pub pt_edges: Vec<f64>,
    pub hadron_label: String,
    pub colors: Vec<String>,
    pub markers: Vec<i32>,
    pub ratio_y_range: (f64, f64),
}

impl Default for SignalOccupancyConfig {
    fn default() -> Self {
        Self {
            task: "hf-task-flow-charm-hadrons".into(),
            task_ft0c: "hf-task-flow-charm-hadrons_occ_ft0c".into(),
            sparse: "hSparseFlowCharm".into(),
            axes: FlowAxes::default(),
            centrality_edges: vec![20.0, 50.0],
            occupancy_edges: vec![0.0, 2000.0, 4000.0, 999999.0],
            ft0c_occupancy_scale: 10.0,
            pt_edges: vec![2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0, 12.0, 24.0],
            hadron_label: "D^{#plus}".into(),
            colors: strings(&["#A73D08", "#D84315", "#FF5722", "#FF8C42", "#FFCC99"]),
            markers: OCC_MARKERS.to_vec(),
            ratio_y_range: (1e-3, 2.02),
        }
    }
}

// ---------------------------------------------------------------------------
// eff-vs-occupancy / eff-vs-centrality
// ---------------------------------------------------------------------------

/// Channel with the y limits of its comparison plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyChannel {
    pub name: String,
    pub label: String,
    /// Lower y limit of the efficiency plot.
    pub eff_y_min: f64,
    /// Upper y limit of the ratio to the first occupancy class.
    pub ratio_y_max: f64,
    /// Upper y limit of the non-prompt/prompt plot.
    pub np_ratio_y_max: f64,
}

/// One input file of `eff-vs-occupancy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityInput {
    /// Appended to output names (`_020`).
    pub suffix: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffOccupancyConfig {
    pub channels: Vec<OccupancyChannel>,
    pub occupancies: Vec<String>,
    /// One entry per input file, in input order.
    pub centralities: Vec<CentralityInput>,
    pub prompt_colors: Vec<String>,
    pub nonprompt_colors: Vec<String>,
    pub markers: Vec<i32>,
    pub x_max: f64,
}

impl Default for EffOccupancyConfig {
    fn default() -> Self {
        let ch = |name: &str, label: &str, eff_y_min: f64| OccupancyChannel {
            name: name.into(),
            label: label.into(),
            eff_y_min,
            ratio_y_max: 2.0,
            np_ratio_y_max: 2.0,
        };
        let cent = |suffix: &str, title: &str| CentralityInput { suffix: suffix.into(), title: title.into() };
        Self {
            channels: vec![
                ch("DzeroToKPi", "D^{0}#rightarrow K#pi", 1e-2),
                ch("DplusToPiKPi", "D^{+}#rightarrow K#pi#pi", 1e-4),
                ch("DsToPhiPiToKKPi", "D_{s}^{+}#rightarrow#phi#pi#rightarrow KK#pi", 1e-4),
                ch("LcToPKPi", "#Lambda_{c}^{+}#rightarrow pK#pi", 1e-4),
            ],
            occupancies: strings(&["0_2000", "2000_4000", "4000_999999"]),
            centralities: vec![
                cent("_020", "(cent. 0-20%)"),
                cent("_2050", "(cent. 20-50%)"),
                cent("_50100", "(cent. 50-100%)"),
            ],
            prompt_colors: strings(&["#D84315", "#FF6F20", "#FFCC99"]),
            nonprompt_colors: strings(&["#1A53B0", "#5398DD", "#A7C7E7"]),
            markers: OCC_MARKERS.to_vec(),
            x_max: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffCentralityConfig {
    pub channels: Vec<Channel>,
    pub centralities: Vec<String>,
    /// Input file index of each centrality class.
    pub file_of_class: Vec<usize>,
    pub prompt_colors: Vec<String>,
    pub nonprompt_colors: Vec<String>,
    pub markers: Vec<i32>,
    pub eff_y_range: (f64, f64),
    pub np_ratio_y_range: (f64, f64),
    pub ratio_y_max: f64,
    pub x_max: f64,
}

impl Default for EffCentralityConfig {
    fn default() -> Self {
        Self {
            channels: vec![
                Channel::new("DzeroToKPi", "D^{0}#rightarrow K#pi"),
                Channel::new("DplusToPiKPi", "D^{+}#rightarrow K#pi#pi"),
                Channel::new("DsToPhiPiToKKPi", "D_{s}^{+}#rightarrow#phi#pi#rightarrow KK#pi"),
                Channel::new("LcToPKPi", "#Lambda_{c}^{+}#rightarrow pK#pi"),
            ],
            centralities: (0..10).map(|i| format!("{}_{}", 10 * i, 10 * (i + 1))).collect(),
            file_of_class: vec![0, 0, 1, 1, 1, 2, 2, 2, 2, 2],
            prompt_colors: strings(&[
                "#FFCC99", "#FFB74D", "#FF8C42", "#FF6F20", "#FF5722", "#E64A19", "#D84315", "#BF360C",
                "#A73D08", "#8A3307",
            ]),
            nonprompt_colors: strings(&[
                "#A7C7E7", "#7AA9E9", "#74B3CE", "#5398DD", "#4A90E2", "#1C75BC", "#1A53B0", "#316C97",
                "#0E3B7C", "#092147",
            ]),
            markers: vec![20, 21, 22, 23, 24, 25, 26, 27, 28, 30],
            eff_y_range: (5e-6, 2.0),
            np_ratio_y_range: (5e-6, 8.0),
            ratio_y_max: 6.5,
            x_max: 50.0,
        }
    }
}

// ---------------------------------------------------------------------------
// tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSpecies {
    pub pdg: i32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingEffConfig {
    pub folder: String,
    /// Folder suffix selected by `--tf-border-cut`.
    pub tf_border_suffix: String,
    pub species: Vec<TrackSpecies>,
    /// Indexed by `species + 6 * input`.
    pub colors: Vec<String>,
    pub alpha: f64,
    /// Positive tracks use `species + 6 * input`, negative ones three further.
    pub markers: Vec<i32>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub comparison_x_max: f64,
}

impl Default for TrackingEffConfig {
    fn default() -> Self {
        let sp = |pdg, label: &str| TrackSpecies { pdg, label: label.into() };
        Self {
            folder: "qa-efficiency".into(),
            tf_border_suffix: "_withTFBorderCut".into(),
            species: vec![sp(211, "#pi"), sp(321, "K"), sp(2212, "p")],
            colors: strings(&[
                "kRed+1", "kAzure+4", "kGreen+2", "kRed+1", "kAzure+4", "kGreen+2", "kOrange+1",
                "kViolet+4", "kCyan+2", "kOrange+1", "kViolet+4", "kCyan+2",
            ]),
            alpha: 0.6,
            markers: vec![20, 21, 22, 24, 25, 26, 29, 33, 34, 30, 27, 28],
            x_range: (0.1, 10.0),
            y_range: (0.3, 1.0),
            comparison_x_max: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingRatio3dConfig {
    pub numerator: String,
    pub denominator: String,
    pub output_name: String,
    /// Centrality windows (X axis values).
    pub x_ranges: Vec<(f64, f64)>,
    /// Occupancy windows (Y axis values).
    pub y_ranges: Vec<(f64, f64)>,
}

impl Default for TrackingRatio3dConfig {
    fn default() -> Self {
        Self {
            numerator: "qa-efficiency_hf_occ/MC/occ_cent/reco/pos/its_tpc".into(),
            denominator: "qa-efficiency_hf_occ/MC/occ_cent/gen/pos".into(),
            output_name: "RatioHistogram_pos".into(),
            x_ranges: vec![(0.0, 20.0), (20.0, 50.0), (50.0, 100.0)],
            y_ranges: vec![(0.0, 2000.0), (2000.0, 4000.0), (4000.0, 99999999.0)],
        }
    }
}

// ---------------------------------------------------------------------------
// comparisons
// ---------------------------------------------------------------------------

/// One panel pair of `compare-mc-eff`: the quantity on top, ratios below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparePlot {
    pub name: String,
    pub y_range: (f64, f64),
    pub y_title: String,
    pub ratio_y_range: (f64, f64),
    pub log_y: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareMcEffConfig {
    pub hadron_label: String,
    pub colors: Vec<String>,
    pub markers: Vec<i32>,
    pub alpha: f64,
    pub selected_step: usize,
    pub duplicates_step: usize,
    pub plots: Vec<ComparePlot>,
}

impl Default for CompareMcEffConfig {
    fn default() -> Self {
        let p = |name: &str, y: (f64, f64), y_title: &str, r: (f64, f64), log_y| ComparePlot {
            name: name.into(),
            y_range: y,
            y_title: y_title.into(),
            ratio_y_range: r,
            log_y,
        };
        Self {
            hadron_label: "D^{0}".into(),
            colors: strings(&[
                "kRed+1", "kRed-7", "kOrange-2", "kSpring-1", "kTeal-2", "kViolet+2", "kAzure+5",
                "kBlue+1", "kCyan+3",
            ]),
            markers: vec![20, 21, 33, 22, 34, 24, 25, 27, 26],
            alpha: 0.6,
            selected_step: 8,
            duplicates_step: 9,
            plots: vec![
                p("prompt_efficiencies", (5e-2, 1.6), "Prompt {had} eff.", (0.86, 1.14), true),
                p("nonprompt_efficiencies", (5e-2, 1.6), "Non-prompt {had} eff.", (0.8, 1.2), true),
                p("ratio_efficiencies", (0.0, 2.0), "Non-prompt/prompt {had} eff.", (0.8, 1.2), false),
                p(
                    "prompt_dupl_efficiencies",
                    (5e-5, 5e-2),
                    "Prompt {had} eff. (duplicates only)",
                    (0.5, 1.5),
                    true,
                ),
                p(
                    "nonprompt_dupl_efficiencies",
                    (5e-5, 2e-1),
                    "Non-prompt {had} eff. (duplicates only)",
                    (0.5, 1.5),
                    true,
                ),
                p(
                    "prompt_efficiencies_no_dupl",
                    (5e-2, 1.6),
                    "Prompt {had} eff. (no duplicates)",
                    (0.86, 1.14),
                    true,
                ),
                p(
                    "nonprompt_efficiencies_no_dupl",
                    (5e-2, 1.6),
                    "Non-prompt {had} eff. (no duplicates)",
                    (0.8, 1.2),
                    true,
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareQaConfig {
    pub channel: String,
    pub centrality: String,
    pub rec_task: String,
    pub rec_histograms: Vec<String>,
    /// Reconstruction-level histograms per page.
    pub rec_per_page: usize,
    pub colors: (String, String),
}

impl Default for CompareQaConfig {
    fn default() -> Self {
        let mut rec = strings(&[
            "histDeltaPt",
            "histDeltaSecondaryVertexX",
            "histDeltaSecondaryVertexY",
            "histDeltaSecondaryVertexZ",
            "histDeltaDecayLength",
        ]);
        for origin in ["Prompt", "NonPrompt"] {
            for dau in 0..3 {
                for var in ["Pt", "Eta", "ImpactParameter"] {
                    rec.push(format!("hist{var}Dau{dau}{origin}"));
                }
            }
        }
        Self {
            channel: "XiCplusToPKPi".into(),
            centrality: "0_110".into(),
            rec_task: "hf-task-mc-validation-rec".into(),
            rec_histograms: rec,
            rec_per_page: 12,
            colors: ("kRed".into(), "kBlue".into()),
        }
    }
}

/// Collision system of a `qa-mc-val` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum CollisionSystem {
    #[serde(rename = "pp")]
    #[value(name = "pp")]
    Pp,
    #[serde(rename = "PbPb")]
    #[value(name = "PbPb")]
    PbPb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaMcValConfig {
    pub gen_task: String,
    pub rec_task: String,
    /// Mesons first, then baryons; the species axis of the generator maps follows this order.
    pub channels: Vec<Channel>,
    pub n_mesons: usize,
    pub pt_bins: Vec<f64>,
    pub centrality_bins_pbpb: Vec<f64>,
    pub centrality_bins_pp: Vec<f64>,
    /// Track origins of the association checks (axis 0 of the association sparses, from bin 1).
    pub track_origins: Vec<String>,
    /// Folder of the track-to-collision checks inside the reconstruction task.
    pub track_to_coll_dir: String,
    pub zvtx_cut: f64,
}

impl Default for QaMcValConfig {
    fn default() -> Self {
        Self {
            gen_task: "hf-task-mc-validation-gen".into(),
            rec_task: "hf-task-mc-validation-rec".into(),
            channels: vec![
                Channel::new("DzeroToKPi", "D^{0} #rightarrow K#pi"),
                Channel::new("DstarToDzeroPi", "D*^{+} #rightarrow D^{0}#pi"),
                Channel::new("DplusToPiKPi", "D^{+} #rightarrow K#pi#pi"),
                Channel::new("DplusToPhiPiToKKPi", "D^{+} #rightarrow KK#pi"),
                Channel::new("DsToPhiPiToKKPi", "D_{s}^{+} #rightarrow #phi#pi #rightarrow KK#pi"),
                Channel::new("DsToK0starKToKKPi", "D_{s}^{+} #rightarrow K^{*}K #rightarrow KK#pi"),
                Channel::new("Ds1ToDStarK0s", "D_{s}1 #rightarrow D*^{+}K^{0}_{s}"),
                Channel::new("Ds2StarToDPlusK0s", "D_{s}2* #rightarrow D^{+}K^{0}_{s}"),
                Channel::new("D10ToDStarPi", "D1^{0} #rightarrow D*^{+}#pi"),
                Channel::new("D2Star0ToDPlusPi", "D2^{*} #rightarrow D^{+}#pi"),
                Channel::new("LcToPKPi", "#Lambda_{c}^{+} #rightarrow pK#pi"),
                Channel::new("LcToPiK0s", "#Lambda_{c}^{+} #rightarrow pK^{0}_{s}"),
                Channel::new("XiCplusToPKPi", "#Xi_{c}^{+} #rightarrow pK#pi"),
                Channel::new("XiCplusToXiPiPi", "#Xi_{c}^{+} #rightarrow #Xi#pi#pi"),
                Channel::new("XiCzeroToXiPi", "#Xi_{c}^{0} #rightarrow #Xi#pi"),
                Channel::new("OmegaCToOmegaPi", "#Omega_{c}^{0} #rightarrow #Omega#pi"),
                Channel::new("OmegaCToXiPi", "#Omega_{c}^{0} #rightarrow #Xi#pi"),
            ],
            n_mesons: 10,
            pt_bins: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0, 12.0, 16.0, 24.0, 36.0, 50.0],
            centrality_bins_pbpb: vec![0.0, 10.0, 30.0, 50.0, 70.0, 100.0],
            centrality_bins_pp: vec![0.0, 110.0],
            track_origins: Vec::new(),
            track_to_coll_dir: "TrackToCollChecks".into(),
            zvtx_cut: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareQaMcValConfig {
    pub mesons: Vec<Channel>,
    pub baryons: Vec<Channel>,
    pub colors: Vec<String>,
    pub markers: Vec<i32>,
    pub alpha: f64,
    pub centrality: String,
}

impl Default for CompareQaMcValConfig {
    fn default() -> Self {
        Self {
            mesons: vec![
                Channel::new("DzeroToKPi", "D^{0}"),
                Channel::new("DplusToPiKPi", "D^{#plus}"),
                Channel::new("DsToPhiPiToKKPi", "D_{s}^{#plus}"),
            ],
            baryons: vec![
                Channel::new("LcToPKPi", "#Lambda_{c}^{#plus}"),
                Channel::new("XiCplusToPKPi", "#Xi_{c}^{#plus}"),
                Channel::new("OmegaCToOmegaPi", "#Omega_{c}"),
            ],
            colors: strings(&["kRed+2", "kBlue+2", "kCyan+4"]),
            markers: vec![20, 21, 33, 22, 34, 24, 25, 27, 26],
            alpha: 0.6,
            centrality: "0_110".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// run bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NevPerRunConfig {
    pub hist_name: String,
    /// Production tag (last six characters of the file stem) to run number.
    /// A mapping given in the config file replaces the bundled one.
    pub run_mapping: BTreeMap<String, String>,
    pub min_bins: usize,
}

const RUN_MAPPING_YAML: &str = include_str!("run_mapping.yaml");

fn bundled_run_mapping() -> BTreeMap<String, String> {
    serde_yaml_ng::from_str(RUN_MAPPING_YAML).unwrap_or_else(|e| {
        log::warn!("bundled run mapping unreadable: {e}");
        BTreeMap::new()
    })
}

impl Default for NevPerRunConfig {
    fn default() -> Self {
        Self { hist_name: "hNevGen".into(), run_mapping: bundled_run_mapping(), min_bins: 220 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub n_target_events: f64,
    pub workers: f64,
    /// Grid CPUs the running time is quoted for.
    pub grid_cpus: f64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self { n_target_events: 1e9, workers: 8.0, grid_cpus: 10_000.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let cfg = AnalysisConfig::from_yaml("").unwrap();
        assert_eq!(cfg.mc_eff.eff_steps, vec![2, 4, 5, 6, 8, 9]);
        assert_eq!(cfg.mc_eff.particles["dzero"].pdg, 421);
        assert_eq!(cfg.signal_occupancy.pt_edges.len(), 9);
        assert_eq!(cfg.qa_mc_val.channels.len(), 17);
        assert_eq!(cfg.compare_qa.rec_histograms.len(), 23);
        assert_eq!(cfg.eff_centrality.centralities[9], "90_100");
    }

    #[test]
    fn partial_override_keeps_other_keys() {
        let yaml = "mc_eff:\n  pt_rebin: [0, 2, 50]\nfit:\n  range: [1.7, 2.1]\n";
        let cfg = AnalysisConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.mc_eff.pt_rebin, vec![0.0, 2.0, 50.0]);
        assert_eq!(cfg.mc_eff.reference_step, 1);
        assert_eq!(cfg.fit.range, (1.7, 2.1));
        assert_eq!(cfg.fit.n_sigma_window, 3.0);
    }

    #[test]
    fn defaults_round_trip_through_yaml() {
        let yaml = serde_yaml_ng::to_string(&AnalysisConfig::default()).unwrap();
        let back = AnalysisConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back.tracking_eff.species, AnalysisConfig::default().tracking_eff.species);
        assert_eq!(back.qa_mc_val.n_mesons, 10);
    }

    #[test]
    fn viz_section_selects_theme() {
        let cfg = AnalysisConfig::from_yaml("viz:\n  figure:\n    width: 321\n").unwrap();
        let viz = cfg.viz_config().unwrap();
        assert_eq!(viz.figure.width, 321.0);
    }

    #[test]
    fn bundled_run_mapping_is_complete() {
        let cfg = NevPerRunConfig::default();
        assert_eq!(cfg.run_mapping.len(), 245);
        assert_eq!(cfg.run_mapping["825590"], "535069");
        assert_eq!(cfg.run_mapping["825836"], "539908");
    }

    #[test]
    fn unknown_collision_system_is_rejected() {
        assert!(serde_yaml_ng::from_str::<CollisionSystem>("\"PbPb\"").is_ok());
        assert!(serde_yaml_ng::from_str::<CollisionSystem>("\"XeXe\"").is_err());
    }
}
