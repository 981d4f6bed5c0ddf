//! Comparison of blockiness score distributions between image corpora.
//!
//! A target corpus is compared against reference corpora compressed at known
//! JPEG qualities. Each comparison is a KL divergence between kernel density
//! estimates, and the divergences are folded into one quality estimate.

use log::warn;
use serde::Serialize;
use statrs::{
    distribution::{Continuous, Normal},
    statistics::{Data, Median, Statistics},
};

use crate::error::{BlockinessError, Result};

pub const DEFAULT_THRESHOLD: f64 = 300.0;

/// Number of points the densities are compared on.
pub const KDE_GRID_POINTS: usize = 3450;

const DENSITY_EPSILON: f64 = 1e-10;

/// Qualities of the reference corpora, in the order they are listed.
pub const JPEG_QUALITY_LADDER: [u8; 5] = [100, 95, 85, 75, 50];

#[derive(Debug, Clone)]
pub struct DatasetScores {
    pub name: String,
    pub values: Vec<f64>,
}

impl DatasetScores {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn below(&self, threshold: f64) -> Self {
        Self {
            name: self.name.clone(),
            values: filter_below(&self.values, threshold),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub count: usize,
    pub median: Option<f64>,
}

/// Drops outliers; NaN never passes.
pub fn filter_below(values: &[f64], threshold: f64) -> Vec<f64> {
    values.iter().copied().filter(|&x| x < threshold).collect()
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

pub fn summarize(dataset: &DatasetScores) -> DatasetSummary {
    DatasetSummary {
        name: dataset.name.clone(),
        count: dataset.values.len(),
        median: median(&dataset.values),
    }
}

/// One-dimensional Gaussian KDE with Scott's rule bandwidth.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    samples: Vec<f64>,
    kernel: Normal,
    bandwidth: f64,
}

impl GaussianKde {
    pub fn new(samples: &[f64]) -> Result<Self> {
        if samples.len() < 2 {
            return Err(BlockinessError::InvalidParameter(format!(
                "KDE needs at least 2 samples, got {}",
                samples.len()
            )));
        }

        let std_dev = samples.iter().std_dev();
        let bandwidth = std_dev * (samples.len() as f64).powf(-0.2);

        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(BlockinessError::AnalysisFailed(format!(
                "degenerate sample spread (std dev {std_dev})"
            )));
        }

        let kernel = Normal::new(0.0, bandwidth)
            .map_err(|e| BlockinessError::AnalysisFailed(format!("kernel construction: {e}")))?;

        Ok(Self {
            samples: samples.to_vec(),
            kernel,
            bandwidth,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let total = self.samples.iter().map(|&s| self.kernel.pdf(x - s)).sum::<f64>();
        total / self.samples.len() as f64
    }

    pub fn evaluate(&self, points: &[f64]) -> Vec<f64> {
        points.iter().map(|&x| self.pdf(x)).collect()
    }
}

/// `count` evenly spaced points from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut points = (0..count).map(|k| start + step * k as f64).collect::<Vec<_>>();
            points[count - 1] = end;
            points
        }
    }
}

/// Elementwise `p ln(p/q) - p + q`, summed.
fn sum_kl_div(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .map(|(&x, &y)| x * (x / y).ln() - x + y)
        .sum()
}

pub fn kl_divergence(target: &[f64], basis: &[f64]) -> Result<f64> {
    let target_kde = GaussianKde::new(target)?;
    let basis_kde = GaussianKde::new(basis)?;

    let lo = Statistics::min(target.iter()).min(Statistics::min(basis.iter()));
    let hi = Statistics::max(target.iter()).max(Statistics::max(basis.iter()));
    if !lo.is_finite() || !hi.is_finite() {
        return Err(BlockinessError::InvalidParameter(
            "scores must be finite".into(),
        ));
    }

    let grid = linspace(lo, hi, KDE_GRID_POINTS);
    let p = target_kde
        .evaluate(&grid)
        .into_iter()
        .map(|d| d + DENSITY_EPSILON)
        .collect::<Vec<_>>();
    let q = basis_kde
        .evaluate(&grid)
        .into_iter()
        .map(|d| d + DENSITY_EPSILON)
        .collect::<Vec<_>>();

    Ok(sum_kl_div(&p, &q))
}

/// KL divergence of a target corpus from each reference quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasisDivergences {
    pub q100: f64,
    pub q95: f64,
    pub q85: f64,
    pub q75: f64,
    pub q50: f64,
}

impl BasisDivergences {
    pub fn from_slice(divergences: &[f64]) -> Result<Self> {
        match *divergences {
            [q100, q95, q85, q75, q50] => Ok(Self {
                q100,
                q95,
                q85,
                q75,
                q50,
            }),
            _ => Err(BlockinessError::InvalidParameter(format!(
                "expected {} basis divergences, got {}",
                JPEG_QUALITY_LADDER.len(),
                divergences.len()
            ))),
        }
    }

    pub fn by_quality(&self) -> [(u8, f64); 5] {
        [
            (100, self.q100),
            (95, self.q95),
            (85, self.q85),
            (75, self.q75),
            (50, self.q50),
        ]
    }

    /// Quality as a fraction of 100, averaged with weights `exp(-KL)`.
    pub fn weighted_quality(&self) -> f64 {
        let pairs = self.by_quality();
        let weight_sum = pairs.iter().map(|&(_, kl)| (-kl).exp()).sum::<f64>();

        pairs
            .iter()
            .map(|&(quality, kl)| quality as f64 / 100.0 * (-kl).exp())
            .sum::<f64>()
            / weight_sum
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DivergenceEntry {
    pub basis: String,
    pub quality: u8,
    pub kl_divergence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityEstimate {
    pub target: String,
    pub divergences: Vec<DivergenceEntry>,
    pub by_quality: BasisDivergences,
    pub estimated_quality: f64,
}

/// `bases` must list exactly the corpora of [`JPEG_QUALITY_LADDER`], in order.
/// Only the target is filtered by `threshold`.
pub fn compare_to_basis(
    target: &DatasetScores,
    bases: &[DatasetScores],
    threshold: f64,
) -> Result<QualityEstimate> {
    if bases.len() != JPEG_QUALITY_LADDER.len() {
        return Err(BlockinessError::InvalidParameter(format!(
            "expected {} basis datasets, got {}",
            JPEG_QUALITY_LADDER.len(),
            bases.len()
        )));
    }

    let filtered = filter_below(&target.values, threshold);
    if filtered.len() < target.values.len() {
        warn!(
            "{}: dropped {} scores at or above {threshold}",
            target.name,
            target.values.len() - filtered.len()
        );
    }

    let mut divergences = Vec::with_capacity(bases.len());
    for (basis, &quality) in bases.iter().zip(JPEG_QUALITY_LADDER.iter()) {
        let kl = kl_divergence(&filtered, &basis.values)?;
        divergences.push(DivergenceEntry {
            basis: basis.name.clone(),
            quality,
            kl_divergence: kl,
        });
    }

    let by_quality = BasisDivergences::from_slice(
        &divergences.iter().map(|d| d.kl_divergence).collect::<Vec<_>>(),
    )?;

    Ok(QualityEstimate {
        target: target.name.clone(),
        divergences,
        by_quality,
        estimated_quality: by_quality.weighted_quality(),
    })
}
