//! Prints the per-coefficient breakdown of one image's blockiness score.

use std::{path::PathBuf, process};

use clap::Parser;
use log::{error, info};

use jpeg_blockiness::{
    AnalysisConfig, BlockinessAnalyzer,
    analysis::blockiness::ZeroVariancePolicy,
    error::Result,
    report::{ImageReport, visualization::coefficient_heatmap},
};

#[derive(Parser, Debug)]
#[command(name = "inspect_blockiness")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to score
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Save an 8x8 heatmap of the per-coefficient scores
    #[arg(long, value_name = "PNG")]
    heatmap: Option<PathBuf>,

    /// Report inf/NaN instead of failing on zero statistics
    #[arg(long)]
    propagate: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}: {e}", args.input.display());
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let zero_variance = if args.propagate {
        ZeroVariancePolicy::Propagate
    } else {
        ZeroVariancePolicy::Reject
    };
    let analyzer = BlockinessAnalyzer::new().with_config(AnalysisConfig {
        zero_variance,
        parallel: false,
    });

    let result = analyzer.analyze_path(&args.input)?;
    println!("{}", ImageReport::from(&result).to_json()?);

    if let Some(path) = &args.heatmap {
        coefficient_heatmap(&result.coefficient_scores, 32).save(path)?;
        info!("Heatmap saved to {}", path.display());
    }

    Ok(())
}
