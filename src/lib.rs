use std::{path::Path, sync::Arc};

use image::DynamicImage;

use crate::{
    analysis::{
        blockiness::{BlockinessConfig, BlockinessEstimator, BlockinessResult, ZeroVariancePolicy},
        dct::Dct,
    },
    error::Result,
    image_utils::{load_gray_raster, to_gray_raster},
};

pub mod analysis;
pub mod dataset;
pub mod error;
pub mod image_utils;
pub mod report;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub zero_variance: ZeroVariancePolicy,
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            zero_variance: ZeroVariancePolicy::Reject,
            parallel: true,
        }
    }
}

/// Scores images read from disk or already decoded. Cheap to share between
/// threads; every call is independent.
#[derive(Debug, Clone)]
pub struct BlockinessAnalyzer {
    estimator: BlockinessEstimator,
    config: AnalysisConfig,
}

impl BlockinessAnalyzer {
    pub fn new() -> Self {
        Self {
            estimator: BlockinessEstimator::new(),
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_dct(dct: Arc<Dct>) -> Result<Self> {
        Ok(Self {
            estimator: BlockinessEstimator::with_dct(dct)?,
            config: AnalysisConfig::default(),
        })
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.estimator = self.estimator.with_config(BlockinessConfig {
            zero_variance: config.zero_variance,
        });
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn estimator(&self) -> &BlockinessEstimator {
        &self.estimator
    }

    pub fn analyze_path<P: AsRef<Path>>(&self, path: P) -> Result<BlockinessResult> {
        let raster = load_gray_raster(path)?;
        self.estimator.estimate(raster.view())
    }

    pub fn analyze_image(&self, image: &DynamicImage) -> Result<BlockinessResult> {
        let raster = to_gray_raster(image);
        self.estimator.estimate(raster.view())
    }

    pub fn score_path<P: AsRef<Path>>(&self, path: P) -> Result<f64> {
        Ok(self.analyze_path(path)?.score)
    }
}

impl Default for BlockinessAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
