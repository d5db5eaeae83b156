// crates/zfold-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zfold_core::{io::write_report_auto, secstruct, FoldParams};
use zfold_engine::{fold, Partition, Topology};

#[derive(Parser, Debug)]
#[command(
    name = "zfold",
    about = "zfold reference CLI",
    long_about = "zfold reference CLI.\n\nCompute RNA partition functions, base-pair probabilities, minimum-free-energy structures, and Boltzmann samples for one or more interacting strands.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Strand input shared by every subcommand.
#[derive(Args, Debug)]
struct SequenceArgs {
    /// Strand sequence(s); pass several to fold interacting strands
    #[arg(required = true)]
    strands: Vec<String>,

    /// Ligate the last residue to the first (circularize)
    #[arg(long)]
    circle: bool,
}

/// Optional overrides applied over the default parameter bundle.
#[derive(Args, Debug)]
struct ParamArgs {
    /// Effective molarity for starting each loop (M)
    #[arg(long)]
    c_init: Option<f64>,

    /// Per-linkage effective-molarity penalty
    #[arg(long)]
    l: Option<f64>,

    /// Base-pair dissociation constant (M)
    #[arg(long)]
    kd_bp: Option<f64>,

    /// Per-base-pair loop-closure penalty
    #[arg(long)]
    l_bp: Option<f64>,

    /// Effective molarity of a stacked pair (M)
    #[arg(long)]
    c_eff_stacked_pair: Option<f64>,

    /// Coaxial-stacking bonus; 0 disables coax
    #[arg(long)]
    k_coax: Option<f64>,

    /// Per-coaxial-stack loop-closure penalty
    #[arg(long)]
    l_coax: Option<f64>,

    /// Standard-state concentration (M)
    #[arg(long)]
    c_std: Option<f64>,

    /// Minimum number of unpaired residues in an apical loop
    #[arg(long)]
    min_loop_length: Option<usize>,

    /// Permit strained three-way junctions
    #[arg(long)]
    allow_strained_3wj: bool,
}

impl ParamArgs {
    fn resolve(&self) -> FoldParams {
        let mut p = FoldParams::default();
        if let Some(v) = self.c_init {
            p.c_init = v;
        }
        if let Some(v) = self.l {
            p.l = v;
        }
        if let Some(v) = self.kd_bp {
            p.kd_bp = v;
        }
        if let Some(v) = self.l_bp {
            p.l_bp = v;
        }
        if let Some(v) = self.c_eff_stacked_pair {
            p.c_eff_stacked_pair = v;
        }
        if let Some(v) = self.k_coax {
            p.k_coax = v;
        }
        if let Some(v) = self.l_coax {
            p.l_coax = v;
        }
        if let Some(v) = self.c_std {
            p.c_std = v;
        }
        if let Some(v) = self.min_loop_length {
            p.min_loop_length = v;
        }
        p.allow_strained_3wj = self.allow_strained_3wj;
        p
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Partition function, BPP matrix, and MFE structure
    Fold {
        #[command(flatten)]
        seq: SequenceArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// Also compute the analytic derivative dZ/dKd_BP
        #[arg(long)]
        deriv: bool,

        /// Only print base pairs with probability above this threshold
        #[arg(long, default_value_t = 1e-3)]
        bpp_threshold: f64,

        /// Print the full report as JSON on stdout instead of text
        #[arg(long)]
        json: bool,

        /// Write a fold report to this path (.json or .cbor)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Boltzmann-weighted structure samples
    Sample {
        #[command(flatten)]
        seq: SequenceArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// RNG seed (samples are deterministic per seed)
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of samples to draw
        #[arg(short = 'n', long, default_value_t = 10)]
        samples: usize,
    },

    /// Exhaustively enumerate the structure ensemble
    Enumerate {
        #[command(flatten)]
        seq: SequenceArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// Print only the most probable `top` structures (0 = all)
        #[arg(long, default_value_t = 0)]
        top: usize,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Fold {
            seq,
            params,
            deriv,
            bpp_threshold,
            json,
            out,
        } => run_fold(&seq, &params.resolve(), deriv, bpp_threshold, json, out),
        Cmd::Sample {
            seq,
            params,
            seed,
            samples,
        } => run_sample(&seq, params.resolve(), seed, samples),
        Cmd::Enumerate { seq, params, top } => run_enumerate(&seq, params.resolve(), top),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn run_fold(
    seq: &SequenceArgs,
    params: &FoldParams,
    deriv: bool,
    bpp_threshold: f64,
    json: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    info!(strands = seq.strands.len(), circle = seq.circle, "folding");
    let report = fold(&seq.strands, *params, seq.circle, deriv)
        .with_context(|| format!("folding {:?}", seq.strands))?;

    if json {
        let line = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{line}");
        if let Some(path) = out {
            write_report_auto(&path, &report)
                .with_context(|| format!("writing report to {}", path.display()))?;
        }
        return Ok(());
    }

    println!("sequence = {}", seq.strands.join("+"));
    println!("Z = {:.8e}", report.z);
    if deriv {
        println!("dZ/dKd_BP = {:.8e}", report.dz);
    }
    println!(
        "MFE {}   p = {:.6}",
        report.mfe_dot_bracket, report.mfe_probability
    );

    let n = report.n;
    let mut printed = 0usize;
    for i in 0..n {
        for j in i + 1..n {
            let b = report.bpp(i, j);
            if b >= bpp_threshold {
                println!("bpp({i},{j}) = {b:.6}");
                printed += 1;
            }
        }
    }
    if printed == 0 {
        println!("no base pairs with probability >= {bpp_threshold}");
    }

    if let Some(path) = out {
        write_report_auto(&path, &report)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("Wrote report to {}", path.display());
    }
    Ok(())
}

fn run_sample(seq: &SequenceArgs, params: FoldParams, seed: u64, samples: usize) -> Result<()> {
    info!(seed, samples, "sampling");
    let topo = Topology::from_strands(&seq.strands, seq.circle)?;
    let mut part = Partition::new(topo, params, false);
    part.run();
    part.cross_checks()?;

    let mut rng = StdRng::seed_from_u64(seed);
    for k in 0..samples {
        let (pairs, prob) = part.boltzmann_sample(&mut rng)?;
        let db = secstruct::dot_bracket_with_breaks(&pairs, part.topology());
        println!("{k:4}  {db}   p = {prob:.6}");
    }
    Ok(())
}

fn run_enumerate(seq: &SequenceArgs, params: FoldParams, top: usize) -> Result<()> {
    let topo = Topology::from_strands(&seq.strands, seq.circle)?;
    let mut part = Partition::new(topo, params, false);
    part.run();
    part.cross_checks()?;

    let mut structures = part.enumerate();
    structures.sort_by(|a, b| b.0.total_cmp(&a.0));
    let shown = if top == 0 { structures.len() } else { top.min(structures.len()) };
    info!(total = structures.len(), shown, "enumerated ensemble");

    for (prob, pairs) in structures.iter().take(shown) {
        let db = secstruct::dot_bracket_with_breaks(pairs, part.topology());
        println!("{db}   p = {prob:.8}");
    }
    Ok(())
}
