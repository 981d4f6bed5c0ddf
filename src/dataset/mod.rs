//! Everything between a directory of images and a list of scores.

pub mod batch;
pub mod config;
pub mod scan;
pub mod score_file;

use log::info;

use crate::{
    analysis::distribution::DatasetScores,
    dataset::{config::DatasetConfig, score_file::read_scores},
    error::Result,
};

/// Reads every score file a config names.
pub fn load_datasets(config: &DatasetConfig) -> Result<Vec<DatasetScores>> {
    config
        .dataset_paths
        .iter()
        .map(|(name, path)| {
            let values = read_scores(path)?;
            info!("{name}: {} scores from {}", values.len(), path.display());
            Ok(DatasetScores::new(name.clone(), values))
        })
        .collect()
}
