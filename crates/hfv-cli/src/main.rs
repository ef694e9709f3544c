//! hfv CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hfv_fit::MassFitter;
use hfv_render::config::VizConfig;
use std::path::{Path, PathBuf};

mod compare;
mod compare_qa_mc_val;
mod config;
mod eff_compare;
mod io;
mod mc_eff;
mod plot;
mod qa_mc_val;
mod resources;
mod runs;
mod signal_occ;
mod tracking;

use config::{AnalysisConfig, CollisionSystem};
use io::Output;
use qa_mc_val::{EventType, QaMcValArgs};

#[derive(Parser)]
#[command(name = "hfv")]
#[command(about = "hfv - heavy-flavour Monte Carlo validation analyses")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    /// Analysis configuration (YAML). Missing keys keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write every figure as a JSON artifact next to its SVG.
    #[arg(long, global = true)]
    figure_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Charm-hadron efficiencies per selection step from the MC efficiency task
    McEff {
        /// Input files (ROOT or JSON bundle); their step histograms are summed
        #[arg(short, long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long, default_value = ".")]
        outpath: PathBuf,

        /// Particle key of the `mc_eff.particles` table
        #[arg(short, long, default_value = "dzero")]
        particle: String,

        /// Read `hf-task-mc-efficiency_id{N}` instead of the plain task directory
        #[arg(long)]
        iddir: Option<String>,

        /// Upper pT limit of the figures (GeV/c)
        #[arg(long, default_value = "999")]
        pt_max: f64,
    },

    /// Mass fits per centrality, occupancy and pT bin of the flow task sparse
    SignalVsOccupancy {
        input: PathBuf,

        /// Output directory. Defaults to `data_occupancy[_ft0c]_{centralities}`.
        #[arg(short, long)]
        outpath: Option<PathBuf>,

        /// Use the FT0C occupancy estimator
        #[arg(long)]
        ft0c: bool,

        /// Centrality edges (percent), overriding the configured ones
        #[arg(long, num_args = 2..)]
        centralities: Option<Vec<f64>>,
    },

    /// Compare prompt/non-prompt efficiencies across occupancy classes
    EffVsOccupancy {
        #[arg(short, long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long, default_value = ".")]
        outpath: PathBuf,
    },

    /// Compare prompt/non-prompt efficiencies across centrality classes
    EffVsCentrality {
        #[arg(short, long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long, default_value = ".")]
        outpath: PathBuf,
    },

    /// ITS-TPC single-track efficiency of pions, kaons and protons
    TrackingEff {
        #[arg(short, long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        /// One legend label per input
        #[arg(short, long, num_args = 1.., required = true)]
        labels: Vec<String>,

        #[arg(short, long, default_value = ".")]
        outpath: PathBuf,

        /// Read the time-frame-border-cut variant of the task
        #[arg(long)]
        tf_border_cut: bool,
    },

    /// Reco/gen TH3 ratio and its projections per centrality and occupancy range
    #[command(name = "tracking-ratio-3d")]
    TrackingRatio3d {
        input: PathBuf,

        #[arg(short, long, default_value = ".")]
        outpath: PathBuf,
    },

    /// Compare step-8/9 efficiencies of several `mc-eff` outputs
    CompareMcEff {
        #[arg(short, long, num_args = 1.., required = true)]
        infiles: Vec<PathBuf>,

        #[arg(short, long, num_args = 1..)]
        labels: Vec<String>,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Compare two QA outputs
    CompareQa {
        file1: PathBuf,
        file2: PathBuf,

        /// Output directory. Defaults to the directory of the first input.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// MC validation QA of one analysis output
    QaMcVal {
        /// Analysis output (e.g. AnalysisResults.root)
        infile: PathBuf,

        outpath: PathBuf,

        /// Appended to every figure name; may be empty ("")
        suffix: String,

        #[arg(value_enum)]
        coll_system: CollisionSystem,

        /// Collision association checks for tracks with a TOF hit
        #[arg(long)]
        coll_ass_tof: bool,

        #[arg(short, long, value_enum, default_value_t)]
        event_type: EventType,

        /// Also draw the generated spectra, efficiency ratios, association and same-BC maps
        #[arg(long)]
        full: bool,
    },

    /// Compare several `qa-mc-val` outputs
    CompareQaMcVal {
        #[arg(short, long, num_args = 1.., required = true)]
        infiles: Vec<PathBuf>,

        #[arg(short, long, num_args = 1..)]
        labels: Vec<String>,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Compare baryons instead of mesons
        #[arg(long)]
        baryons: bool,
    },

    /// Generated events per run from a directory of outputs
    NevPerRun {
        input_dir: PathBuf,

        /// Histogram bundle to write (JSON); the figure lands next to it
        output_file: PathBuf,

        /// Histogram whose entries are counted (default from config)
        #[arg(long)]
        hist_name: Option<String>,
    },

    /// Store the generated-events counter of an output as `hGenEv`
    StoreHist {
        root_file: PathBuf,

        #[arg(short, long, default_value = ".")]
        outpath: PathBuf,
    },

    /// Grid running time and disk estimate scaled from a test production
    Resources {
        /// Global runtime of the test production (s)
        #[arg(long, default_value = "1488.735")]
        runtime: f64,

        /// Events produced by the test production
        #[arg(long, default_value = "500")]
        n_produced: f64,

        /// Output size of the test production (MB)
        #[arg(long, default_value = "23.34")]
        size: f64,

        /// Target number of events (default from config)
        #[arg(long)]
        n_target: Option<f64>,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit one invariant-mass histogram (Gaussian signal + exponential background)
    FitMass {
        input: PathBuf,

        /// Object path of the TH1 inside the input
        #[arg(long)]
        hist: String,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also draw the fit into this directory
        #[arg(long)]
        figure_dir: Option<PathBuf>,
    },

    /// List the objects of a ROOT file or JSON bundle
    Ls {
        input: PathBuf,
    },

    /// Print the effective analysis configuration (YAML)
    Config,
}

/// Shared state of one invocation.
pub struct Ctx {
    pub config: AnalysisConfig,
    pub viz: VizConfig,
    pub figure_json: bool,
}

impl Ctx {
    fn load(path: Option<&Path>, figure_json: bool) -> Result<Self> {
        let config = match path {
            Some(p) => AnalysisConfig::load(p)?,
            None => AnalysisConfig::default(),
        };
        let viz = config.viz_config().context("resolving viz config")?;
        Ok(Self { config, viz, figure_json })
    }

    /// Output directory `dir`, created when missing.
    pub fn output(&self, dir: &Path) -> Result<Output> {
        Output::create(dir, self.viz.clone(), self.figure_json)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_log::LogTracer::init().ok();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let ctx = Ctx::load(cli.config.as_deref(), cli.figure_json)?;

    match cli.command {
        Commands::McEff { inputs, outpath, particle, iddir, pt_max } => {
            mc_eff::cmd_mc_eff(&ctx, &inputs, &outpath, &particle, iddir.as_deref(), pt_max)
        }
        Commands::SignalVsOccupancy { input, outpath, ft0c, centralities } => {
            signal_occ::cmd_signal_vs_occupancy(
                &ctx,
                &input,
                outpath.as_deref(),
                ft0c,
                centralities.as_deref(),
            )
        }
        Commands::EffVsOccupancy { inputs, outpath } => {
            eff_compare::cmd_eff_vs_occupancy(&ctx, &inputs, &outpath)
        }
        Commands::EffVsCentrality { inputs, outpath } => {
            eff_compare::cmd_eff_vs_centrality(&ctx, &inputs, &outpath)
        }
        Commands::TrackingEff { inputs, labels, outpath, tf_border_cut } => {
            tracking::cmd_tracking_eff(&ctx, &inputs, &labels, &outpath, tf_border_cut)
        }
        Commands::TrackingRatio3d { input, outpath } => {
            tracking::cmd_tracking_ratio_3d(&ctx, &input, &outpath)
        }
        Commands::CompareMcEff { infiles, labels, output_dir } => {
            compare::cmd_compare_mc_eff(&ctx, &infiles, &labels, &output_dir)
        }
        Commands::CompareQa { file1, file2, output_dir } => {
            compare::cmd_compare_qa(&ctx, &file1, &file2, output_dir.as_deref())
        }
        Commands::QaMcVal {
            infile,
            outpath,
            suffix,
            coll_system,
            coll_ass_tof,
            event_type,
            full,
        } => qa_mc_val::cmd_qa_mc_val(
            &ctx,
            &QaMcValArgs {
                input: &infile,
                out_dir: &outpath,
                suffix: &suffix,
                system: coll_system,
                coll_ass_tof,
                event_type,
                full,
            },
        ),
        Commands::CompareQaMcVal { infiles, labels, output_dir, baryons } => {
            compare_qa_mc_val::cmd_compare_qa_mc_val(&ctx, &infiles, &labels, &output_dir, baryons)
        }
        Commands::NevPerRun { input_dir, output_file, hist_name } => {
            runs::cmd_nev_per_run(&ctx, &input_dir, &output_file, hist_name.as_deref())
        }
        Commands::StoreHist { root_file, outpath } => {
            runs::cmd_store_hist(&ctx, &root_file, &outpath)
        }
        Commands::Resources { runtime, n_produced, size, n_target, output } => {
            let test = resources::TestProduction { runtime, n_produced, size };
            resources::cmd_resources(&ctx, &test, n_target, output.as_ref())
        }
        Commands::FitMass { input, hist, output, figure_dir } => {
            cmd_fit_mass(&ctx, &input, &hist, output.as_ref(), figure_dir.as_deref())
        }
        Commands::Ls { input } => cmd_ls(&input),
        Commands::Config => cmd_config(&ctx),
    }
}

fn cmd_fit_mass(
    ctx: &Ctx,
    input: &Path,
    hist: &str,
    output: Option<&PathBuf>,
    figure_dir: Option<&Path>,
) -> Result<()> {
    let src = io::open_source(input)?;
    let h = src.get_h1(hist).with_context(|| format!("reading {hist}"))?;
    let fitter = MassFitter::new(ctx.config.fit.clone());
    let fit = fitter.fit(&h).with_context(|| format!("fitting {hist}"))?;
    tracing::info!(
        converged = fit.converged,
        signal = fit.signal.value,
        significance = fit.significance.value,
        "mass fit"
    );

    if let Some(dir) = figure_dir {
        let name = format!("fit_{}", h.name);
        let fig = signal_occ::fit_figure(name, &h, &fit, &h.title);
        ctx.output(dir)?.save(&fig)?;
    }
    io::write_json(output, &serde_json::to_value(&fit)?)
}

fn cmd_ls(input: &Path) -> Result<()> {
    if input.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
        let bundle = hfv_core::HistBundle::read_json(input)
            .with_context(|| format!("reading bundle {}", input.display()))?;
        for path in bundle.paths() {
            if let Some(obj) = bundle.get(path) {
                println!("{}\t{}", obj.kind(), path);
            }
        }
    } else {
        let file = hfv_root::RootFile::open(input)
            .with_context(|| format!("opening {}", input.display()))?;
        for entry in file.walk()? {
            println!("{}\t{}", entry.info.class_name, entry.path);
        }
    }
    Ok(())
}

fn cmd_config(ctx: &Ctx) -> Result<()> {
    print!("{}", serde_yaml_ng::to_string(&ctx.config)?);
    Ok(())
}
