pub mod visualization;

use serde::Serialize;

use crate::analysis::{
    blockiness::BlockinessResult,
    distribution::{DatasetSummary, QualityEstimate},
};

#[derive(Debug, Default, Serialize)]
pub struct DistributionReport {
    pub threshold: f64,
    pub targets: Vec<DatasetSummary>,
    pub bases: Vec<DatasetSummary>,
    pub estimates: Vec<QualityEstimate>,
}

impl DistributionReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub score: f64,
    pub cal_height: usize,
    pub cal_width: usize,
    /// Row-major 8x8 per-coefficient scores.
    pub coefficient_scores: Vec<Vec<f64>>,
}

impl From<&BlockinessResult> for ImageReport {
    fn from(result: &BlockinessResult) -> Self {
        Self {
            score: result.score,
            cal_height: result.margin.cal_height,
            cal_width: result.margin.cal_width,
            coefficient_scores: result
                .coefficient_scores
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        }
    }
}

impl ImageReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
