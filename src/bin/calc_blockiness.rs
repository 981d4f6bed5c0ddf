//! Scores every image under a directory and writes `<path>\t<score>` lines.

use std::{fs::File, io::BufWriter, path::PathBuf, process};

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use jpeg_blockiness::{
    AnalysisConfig, BlockinessAnalyzer,
    analysis::blockiness::ZeroVariancePolicy,
    dataset::{
        batch::score_images,
        scan::{scan_images, select_range},
        score_file::write_scores,
    },
    error::Result,
};

/// Detect JPEG blocking artifacts in images and save the scores.
#[derive(Parser, Debug)]
#[command(name = "calc_blockiness")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory containing the images
    #[arg(long)]
    rootpath: PathBuf,

    /// File to save the results to
    #[arg(long)]
    savefile: PathBuf,

    /// File name suffix of the images to process
    #[arg(long, default_value = "png")]
    suffix: String,

    /// Index of the first image to process, in sorted order
    #[arg(long, default_value_t = 0)]
    target_idx_former: usize,

    /// Index one past the last image to process
    #[arg(long, default_value_t = 100_000_000)]
    target_idx_latter: usize,

    /// Handling of coefficients whose aligned-grid statistic is zero
    #[arg(long, value_enum, default_value = "reject")]
    zero_variance: ZeroVarianceArg,

    /// Score images one at a time
    #[arg(long)]
    sequential: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ZeroVarianceArg {
    /// Skip the image
    Reject,
    /// Write inf/NaN scores
    Propagate,
}

impl From<ZeroVarianceArg> for ZeroVariancePolicy {
    fn from(arg: ZeroVarianceArg) -> Self {
        match arg {
            ZeroVarianceArg::Reject => ZeroVariancePolicy::Reject,
            ZeroVarianceArg::Propagate => ZeroVariancePolicy::Propagate,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let relative = scan_images(&args.rootpath, &args.suffix)?;
    let relative = select_range(relative, args.target_idx_former, args.target_idx_latter);
    let paths = relative
        .iter()
        .map(|p| args.rootpath.join(p))
        .collect::<Vec<_>>();

    info!(
        "Found {} *{} images under {}",
        paths.len(),
        args.suffix,
        args.rootpath.display()
    );

    let analyzer = BlockinessAnalyzer::new().with_config(AnalysisConfig {
        zero_variance: args.zero_variance.into(),
        parallel: !args.sequential,
    });

    let progress = ProgressBar::new(paths.len() as u64);
    let template = "{bar:40} {pos}/{len} [{elapsed_precise}<{eta_precise}]";
    if let Ok(style) = ProgressStyle::with_template(template) {
        progress.set_style(style);
    }

    let outcome = score_images(&analyzer, &paths, |_| progress.inc(1));
    progress.finish();

    let writer = BufWriter::new(File::create(&args.savefile)?);
    write_scores(writer, &outcome.records)?;

    info!(
        "Wrote {} scores to {} ({} images skipped)",
        outcome.records.len(),
        args.savefile.display(),
        outcome.failures.len()
    );

    Ok(())
}
