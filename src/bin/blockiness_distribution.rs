//! Compares blockiness distributions of target corpora against reference
//! corpora of known JPEG quality.

use std::{fs, path::PathBuf, process};

use clap::Parser;
use log::{error, info, warn};

use jpeg_blockiness::{
    analysis::distribution::{
        DEFAULT_THRESHOLD, DatasetScores, DatasetSummary, compare_to_basis, summarize,
    },
    dataset::{config::DatasetConfig, load_datasets},
    error::Result,
    report::{
        DistributionReport,
        visualization::{PlotConfig, ViolinPlot},
    },
};

/// Blockiness analysis and visualization.
#[derive(Parser, Debug)]
#[command(name = "blockiness_distribution")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Render a violin plot of the target datasets
    #[arg(long)]
    visualize: bool,

    /// Scores at or above this value are treated as outliers
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// YAML file listing the target datasets
    #[arg(long)]
    config_target_dataset: PathBuf,

    /// YAML file listing the reference datasets, ordered by JPEG quality 100, 95, 85, 75, 50
    #[arg(long)]
    config_basis_dataset: PathBuf,

    /// Where the plot goes when --visualize is set
    #[arg(long, default_value = "blockiness_comparison.png")]
    plot_output: PathBuf,

    /// Also write the full results as JSON
    #[arg(long)]
    json_output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        process::exit(1);
    }
}

fn print_summaries(datasets: &[DatasetScores]) -> Vec<DatasetSummary> {
    datasets
        .iter()
        .map(|dataset| {
            let summary = summarize(dataset);
            match summary.median {
                Some(m) => println!("{}: Median = {m}, len = {}", summary.name, summary.count),
                None => println!("{}: No valid data found.", summary.name),
            }
            summary
        })
        .collect()
}

fn run(args: &Args) -> Result<()> {
    let targets = load_datasets(&DatasetConfig::load(&args.config_target_dataset)?)?;
    let bases = load_datasets(&DatasetConfig::load(&args.config_basis_dataset)?)?;

    let mut report = DistributionReport {
        threshold: args.threshold,
        targets: print_summaries(&targets),
        bases: print_summaries(&bases),
        ..Default::default()
    };

    if args.visualize {
        let plot = ViolinPlot::with_config(PlotConfig {
            threshold: args.threshold,
            ..Default::default()
        });
        plot.render(&targets)?.save(&args.plot_output)?;
        info!("Plot saved to {}", args.plot_output.display());
    }

    for target in &targets {
        match compare_to_basis(target, &bases, args.threshold) {
            Ok(estimate) => {
                for d in &estimate.divergences {
                    println!(
                        "KL Divergence from {} to {} ({}): {}",
                        estimate.target, d.basis, d.quality, d.kl_divergence
                    );
                }
                println!(
                    "Average Blockiness for {}: {}",
                    estimate.target, estimate.estimated_quality
                );
                report.estimates.push(estimate);
            }
            Err(e) => warn!("Cannot compare {}: {e}", target.name),
        }
    }

    if let Some(path) = &args.json_output {
        fs::write(path, report.to_json()?)?;
        info!("Report saved to {}", path.display());
    }

    Ok(())
}
