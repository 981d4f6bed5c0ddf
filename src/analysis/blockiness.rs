use std::sync::Arc;

use log::debug;
use ndarray::{Array2, ArrayView2, s};

use crate::{
    analysis::dct::{BLOCK_SIZE, Dct},
    error::{BlockinessError, Result},
};

/// Offset of the second, deliberately misaligned tiling.
pub const SHIFT: usize = BLOCK_SIZE / 2;

/// Fewest blocks per axis that still leave one interior block.
pub const MIN_BLOCKS: usize = 4;

/// What to do when the aligned-grid statistic of a coefficient is exactly zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroVariancePolicy {
    /// Fail the image with [`BlockinessError::UndefinedScore`].
    #[default]
    Reject,
    /// Keep IEEE division results (`inf` or `NaN`) and let the caller filter.
    Propagate,
}

#[derive(Debug, Clone, Default)]
pub struct BlockinessConfig {
    pub zero_variance: ZeroVariancePolicy,
}

/// Trimming that aligns an image to whole blocks while keeping at least
/// [`SHIFT`] spare pixels for the shifted tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margin {
    pub cal_height: usize,
    pub cal_width: usize,
    pub h_margin: usize,
    pub w_margin: usize,
}

impl Margin {
    pub fn h_blocks(&self) -> usize {
        self.cal_height / BLOCK_SIZE
    }

    pub fn w_blocks(&self) -> usize {
        self.cal_width / BLOCK_SIZE
    }
}

fn axis_margin(len: usize) -> usize {
    let rem = len % BLOCK_SIZE;
    if rem >= SHIFT { rem } else { rem + BLOCK_SIZE }
}

pub fn calc_margin(height: usize, width: usize) -> Result<Margin> {
    let h_margin = axis_margin(height);
    let w_margin = axis_margin(width);

    if height <= h_margin || width <= w_margin {
        return Err(BlockinessError::ImageTooSmall { width, height });
    }

    Ok(Margin {
        cal_height: height - h_margin,
        cal_width: width - w_margin,
        h_margin,
        w_margin,
    })
}

/// Block-wise DCT of the top-left `h_blocks x w_blocks` tiles of `image`.
pub fn calc_dct(
    image: ArrayView2<f64>,
    dct: &Dct,
    h_blocks: usize,
    w_blocks: usize,
) -> Result<Array2<f64>> {
    let n = dct.size();
    let (height, width) = image.dim();

    if height < h_blocks * n || width < w_blocks * n {
        return Err(BlockinessError::InvalidParameter(format!(
            "{h_blocks}x{w_blocks} blocks of {n}px do not fit a {width}x{height} raster"
        )));
    }

    let mut dct_img = Array2::<f64>::zeros((h_blocks * n, w_blocks * n));

    for h_block in 0..h_blocks {
        for w_block in 0..w_blocks {
            let rows = h_block * n..(h_block + 1) * n;
            let cols = w_block * n..(w_block + 1) * n;

            let coeffs = dct.transform(image.slice(s![rows.clone(), cols.clone()]))?;
            dct_img.slice_mut(s![rows, cols]).assign(&coeffs);
        }
    }

    Ok(dct_img)
}

/// Mean four-neighbour second-difference magnitude of every coefficient
/// position, over blocks `1..=h_blocks-3` by `1..=w_blocks-3`.
///
/// Each centre is read at its own block index. Tools that read the centre one
/// block further down and right produce scores on a different scale, so score
/// files from such tools are not comparable with these.
pub fn calc_v(dct_img: ArrayView2<f64>, h_blocks: usize, w_blocks: usize) -> Result<Array2<f64>> {
    if h_blocks < MIN_BLOCKS || w_blocks < MIN_BLOCKS {
        return Err(BlockinessError::InvalidParameter(format!(
            "need at least {MIN_BLOCKS}x{MIN_BLOCKS} blocks, got {h_blocks}x{w_blocks}"
        )));
    }
    if dct_img.dim() != (h_blocks * BLOCK_SIZE, w_blocks * BLOCK_SIZE) {
        return Err(BlockinessError::InvalidParameter(format!(
            "DCT map of {:?} does not hold {h_blocks}x{w_blocks} blocks",
            dct_img.dim()
        )));
    }

    let interior = ((h_blocks - 3) * (w_blocks - 3)) as f64;
    let mut v_average = Array2::<f64>::zeros((BLOCK_SIZE, BLOCK_SIZE));

    for j in 0..BLOCK_SIZE {
        for i in 0..BLOCK_SIZE {
            let mut v_sum = 0.0;

            for h_block in 1..=h_blocks - 3 {
                for w_block in 1..=w_blocks - 3 {
                    let h_idx = h_block * BLOCK_SIZE + j;
                    let w_idx = w_block * BLOCK_SIZE + i;

                    let a = dct_img[[h_idx, w_idx]];
                    let b = dct_img[[h_idx, w_idx - BLOCK_SIZE]];
                    let c = dct_img[[h_idx, w_idx + BLOCK_SIZE]];
                    let d = dct_img[[h_idx - BLOCK_SIZE, w_idx]];
                    let e = dct_img[[h_idx + BLOCK_SIZE, w_idx]];

                    let horizontal = b + c - 2.0 * a;
                    let vertical = d + e - 2.0 * a;
                    v_sum += (horizontal * horizontal + vertical * vertical).sqrt();
                }
            }

            v_average[[j, i]] = v_sum / interior;
        }
    }

    Ok(v_average)
}

#[derive(Debug, Clone)]
pub struct BlockinessResult {
    pub score: f64,
    /// Relative difference per coefficient position; sums to `score`.
    pub coefficient_scores: Array2<f64>,
    pub v_average: Array2<f64>,
    pub vc_average: Array2<f64>,
    pub margin: Margin,
}

#[derive(Debug, Clone)]
pub struct BlockinessEstimator {
    dct: Arc<Dct>,
    config: BlockinessConfig,
}

impl BlockinessEstimator {
    pub fn new() -> Self {
        Self {
            dct: Arc::new(Dct::new()),
            config: BlockinessConfig::default(),
        }
    }

    /// Reuses an existing basis, which must be for 8x8 blocks.
    pub fn with_dct(dct: Arc<Dct>) -> Result<Self> {
        if dct.size() != BLOCK_SIZE {
            return Err(BlockinessError::InvalidParameter(format!(
                "blockiness needs a {BLOCK_SIZE}-point DCT, got {}",
                dct.size()
            )));
        }

        Ok(Self {
            dct,
            config: BlockinessConfig::default(),
        })
    }

    pub fn with_config(mut self, config: BlockinessConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dct(&self) -> &Arc<Dct> {
        &self.dct
    }

    pub fn config(&self) -> &BlockinessConfig {
        &self.config
    }

    pub fn estimate(&self, image: ArrayView2<f64>) -> Result<BlockinessResult> {
        let (height, width) = image.dim();
        let margin = calc_margin(height, width)?;
        let (h_blocks, w_blocks) = (margin.h_blocks(), margin.w_blocks());

        if h_blocks < MIN_BLOCKS || w_blocks < MIN_BLOCKS {
            return Err(BlockinessError::ImageTooSmall { width, height });
        }

        let dct_img = calc_dct(image, &self.dct, h_blocks, w_blocks)?;
        let shifted = image.slice(s![SHIFT.., SHIFT..]);
        let dct_shifted_img = calc_dct(shifted, &self.dct, h_blocks, w_blocks)?;

        let v_average = calc_v(dct_img.view(), h_blocks, w_blocks)?;
        let vc_average = calc_v(dct_shifted_img.view(), h_blocks, w_blocks)?;

        let coefficient_scores = self.reduce(&v_average, &vc_average)?;
        let score = coefficient_scores.sum();

        debug!("{width}x{height} raster, {h_blocks}x{w_blocks} blocks, score {score}");

        Ok(BlockinessResult {
            score,
            coefficient_scores,
            v_average,
            vc_average,
            margin,
        })
    }

    fn reduce(&self, v_average: &Array2<f64>, vc_average: &Array2<f64>) -> Result<Array2<f64>> {
        if self.config.zero_variance == ZeroVariancePolicy::Reject {
            if let Some(((row, col), _)) = v_average.indexed_iter().find(|&(_, &v)| v == 0.0) {
                return Err(BlockinessError::UndefinedScore { row, col });
            }
        }

        Ok(ndarray::Zip::from(vc_average.view())
            .and(v_average.view())
            .map_collect(|&vc, &v| ((vc - v) / v).abs()))
    }
}

impl Default for BlockinessEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn noise(height: usize, width: usize, amplitude: f64, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((height, width), |_| rng.random_range(0.0..amplitude))
    }

    #[test]
    fn test_margin_known_values() {
        let m = calc_margin(256, 37).unwrap();
        assert_eq!((m.cal_height, m.h_margin), (248, 8));
        assert_eq!((m.cal_width, m.w_margin), (32, 5));

        let m = calc_margin(42, 44).unwrap();
        assert_eq!((m.cal_height, m.h_margin), (32, 10));
        assert_eq!((m.cal_width, m.w_margin), (40, 4));
    }

    #[test]
    fn test_margin_alignment_invariant() {
        for height in 40..300 {
            for width in [40, 41, 43, 47, 64, 99, 128, 255] {
                let m = calc_margin(height, width).unwrap();
                assert_eq!(m.cal_height % BLOCK_SIZE, 0);
                assert_eq!(m.cal_width % BLOCK_SIZE, 0);
                assert!((4..=11).contains(&m.h_margin));
                assert!((4..=11).contains(&m.w_margin));
                assert_eq!(m.cal_height + m.h_margin, height);
                assert_eq!(m.cal_width + m.w_margin, width);
            }
        }
    }

    #[test]
    fn test_margin_rejects_tiny_images() {
        assert!(matches!(
            calc_margin(3, 100),
            Err(BlockinessError::ImageTooSmall { width: 100, height: 3 })
        ));
        assert!(calc_margin(100, 8).is_err());
    }

    #[test]
    fn test_calc_dct_places_blocks() {
        let dct = Dct::new();
        let image = Array2::from_shape_fn((24, 32), |(y, x)| (10 * (y / 8) + x / 8) as f64);

        let dct_img = calc_dct(image.view(), &dct, 3, 4).unwrap();
        assert_eq!(dct_img.dim(), (24, 32));

        for r in 0..3 {
            for c in 0..4 {
                let dc = dct_img[[r * 8, c * 8]];
                assert!((dc - 8.0 * (10 * r + c) as f64).abs() < 1e-9);
                assert!(dct_img[[r * 8 + 3, c * 8 + 5]].abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_calc_dct_uses_only_aligned_region() {
        let dct = Dct::new();
        let mut image = Array2::from_elem((20, 20), 1.0);
        image.slice_mut(s![16.., ..]).fill(500.0);

        let dct_img = calc_dct(image.view(), &dct, 2, 2).unwrap();
        assert!(dct_img.iter().all(|&v| v.abs() < 8.0 + 1e-9));
    }

    #[test]
    fn test_calc_v_second_difference() {
        let (h_blocks, w_blocks) = (6, 7);
        let rows_only = Array2::from_shape_fn((h_blocks * 8, w_blocks * 8), |(y, _)| {
            let r = (y / 8) as f64;
            r * r
        });
        let v = calc_v(rows_only.view(), h_blocks, w_blocks).unwrap();
        assert!(v.iter().all(|&x| (x - 2.0).abs() < 1e-12));

        let both = Array2::from_shape_fn((h_blocks * 8, w_blocks * 8), |(y, x)| {
            let (r, c) = ((y / 8) as f64, (x / 8) as f64);
            r * r + c * c
        });
        let v = calc_v(both.view(), h_blocks, w_blocks).unwrap();
        assert!(v.iter().all(|&x| (x - 8.0f64.sqrt()).abs() < 1e-12));
    }

    #[test]
    fn test_calc_v_skips_outer_ring() {
        let (h_blocks, w_blocks) = (5, 5);
        let mut dct_img = Array2::<f64>::zeros((40, 40));
        // block (4, 4) lies outside every neighbourhood
        dct_img[[32, 32]] = 1000.0;
        dct_img[[16, 16]] = 1.0;

        let v = calc_v(dct_img.view(), h_blocks, w_blocks).unwrap();
        // centre (2, 2) sees -2 both ways, centres (1, 2) and (2, 1) see +1 once
        let expected = (8.0f64.sqrt() + 2.0) / 4.0;
        assert!((v[[0, 0]] - expected).abs() < 1e-12);
        assert_eq!(v[[1, 1]], 0.0);
    }

    #[test]
    fn test_estimate_rejects_small_image() {
        let estimator = BlockinessEstimator::new();
        let image = noise(30, 200, 255.0, 1);

        assert!(matches!(
            estimator.estimate(image.view()),
            Err(BlockinessError::ImageTooSmall { width: 200, height: 30 })
        ));
    }

    #[test]
    fn test_estimate_accepts_four_blocks_per_axis() {
        let estimator = BlockinessEstimator::new();
        let image = noise(36, 36, 255.0, 5);

        let result = estimator.estimate(image.view()).unwrap();
        assert_eq!((result.margin.h_blocks(), result.margin.w_blocks()), (4, 4));
        assert!(result.score.is_finite());
        assert!(result.score > 0.0);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let estimator = BlockinessEstimator::new();
        let image = noise(97, 75, 255.0, 42);

        let first = estimator.estimate(image.view()).unwrap();
        let second = estimator.estimate(image.view()).unwrap();

        assert_eq!(first.score.to_bits(), second.score.to_bits());
        assert_eq!(first.margin, second.margin);
    }

    #[test]
    fn test_score_is_sum_of_coefficients() {
        let estimator = BlockinessEstimator::new();
        let result = estimator.estimate(noise(64, 64, 255.0, 9).view()).unwrap();

        assert_eq!(result.coefficient_scores.dim(), (8, 8));
        assert!((result.coefficient_scores.sum() - result.score).abs() < 1e-12);
        assert!(result.score >= 0.0);
    }

    #[test]
    fn test_noise_baseline_is_near_zero() {
        let estimator = BlockinessEstimator::new();
        let result = estimator.estimate(noise(256, 256, 255.0, 7).view()).unwrap();

        // mean relative discrepancy per coefficient stays under 10%
        assert!(result.score < 6.4, "noise score {}", result.score);
    }

    #[test]
    fn test_block_offsets_raise_score() {
        let mut rng = StdRng::seed_from_u64(3);
        let offsets = Array2::from_shape_fn((16, 16), |_| rng.random_range(0.0..120.0));
        let clean = noise(128, 128, 8.0, 11);
        let blocky =
            Array2::from_shape_fn((128, 128), |(y, x)| clean[[y, x]] + offsets[[y / 8, x / 8]]);

        let estimator = BlockinessEstimator::new();
        let clean_score = estimator.estimate(clean.view()).unwrap().score;
        let blocky_score = estimator.estimate(blocky.view()).unwrap().score;

        assert!(
            blocky_score > 10.0 * clean_score,
            "blocky {blocky_score} vs clean {clean_score}"
        );
    }

    #[test]
    fn test_all_zero_image_rejected_by_default() {
        let estimator = BlockinessEstimator::new();
        let image = Array2::<f64>::zeros((256, 256));

        assert!(matches!(
            estimator.estimate(image.view()),
            Err(BlockinessError::UndefinedScore { row: 0, col: 0 })
        ));
    }

    #[test]
    fn test_all_zero_image_propagates_nan() {
        let estimator = BlockinessEstimator::new().with_config(BlockinessConfig {
            zero_variance: ZeroVariancePolicy::Propagate,
        });
        let image = Array2::<f64>::zeros((256, 256));

        let result = estimator.estimate(image.view()).unwrap();
        assert!(result.score.is_nan());
        assert!(result.v_average.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_with_dct_requires_eight_point_basis() {
        assert!(BlockinessEstimator::with_dct(Arc::new(Dct::with_size(4))).is_err());

        let shared = Arc::new(Dct::new());
        let estimator = BlockinessEstimator::with_dct(Arc::clone(&shared)).unwrap();
        assert!(Arc::ptr_eq(estimator.dct(), &shared));
    }
}
