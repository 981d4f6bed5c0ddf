use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{BlockinessAnalyzer, error::BlockinessError};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub path: PathBuf,
    pub score: f64,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: BlockinessError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<ScoreRecord>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn scores(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.score).collect()
    }
}

/// Scores every image, keeping input order. Unreadable or unscorable images
/// become [`BatchFailure`]s. `on_item` runs once per path, possibly from
/// several threads.
pub fn score_images<F>(analyzer: &BlockinessAnalyzer, paths: &[PathBuf], on_item: F) -> BatchOutcome
where
    F: Fn(&Path) + Sync,
{
    let score_one = |path: &PathBuf| {
        let result = analyzer.score_path(path);
        on_item(path);
        (path.clone(), result)
    };

    let results = if analyzer.config().parallel {
        paths.par_iter().map(score_one).collect::<Vec<_>>()
    } else {
        paths.iter().map(score_one).collect::<Vec<_>>()
    };

    let mut outcome = BatchOutcome::default();
    for (path, result) in results {
        match result {
            Ok(score) => outcome.records.push(ScoreRecord { path, score }),
            Err(error) => {
                warn!("Skipping {}: {error}", path.display());
                outcome.failures.push(BatchFailure { path, error });
            }
        }
    }

    info!(
        "Scored {} of {} images ({} failed)",
        outcome.records.len(),
        paths.len(),
        outcome.failures.len()
    );

    outcome
}
