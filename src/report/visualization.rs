use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut},
    rect::Rect,
};
use log::warn;
use ndarray::Array2;

use crate::{
    analysis::distribution::{DatasetScores, DEFAULT_THRESHOLD, GaussianKde, median},
    error::{BlockinessError, Result},
};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    /// Upper end of the value axis; larger scores are left out.
    pub threshold: f64,
    pub fill: Rgb<u8>,
    /// Fraction of a dataset column the widest part of a violin may use.
    pub violin_width: f32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            padding: 40,
            threshold: DEFAULT_THRESHOLD,
            fill: Rgb([255, 0, 0]),
            violin_width: 0.8,
        }
    }
}

/// Mirrored density of each dataset's scores, one column per dataset, value
/// axis growing upwards from zero to the threshold.
pub struct ViolinPlot {
    config: PlotConfig,
}

impl ViolinPlot {
    pub fn new() -> Self {
        Self {
            config: PlotConfig::default(),
        }
    }

    pub fn with_config(config: PlotConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, datasets: &[DatasetScores]) -> Result<RgbImage> {
        let PlotConfig {
            width,
            height,
            padding,
            threshold,
            ..
        } = self.config;

        if datasets.is_empty() {
            return Err(BlockinessError::InvalidParameter("nothing to plot".into()));
        }
        if width <= 2 * padding || height <= 2 * padding || threshold <= 0.0 {
            return Err(BlockinessError::InvalidParameter(format!(
                "plot area {width}x{height} with padding {padding} and threshold {threshold} is empty"
            )));
        }

        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
        let plot_w = width - 2 * padding;
        let plot_h = height - 2 * padding;
        let column_w = plot_w as f32 / datasets.len() as f32;

        for (idx, dataset) in datasets.iter().enumerate() {
            let center = padding as f32 + column_w * (idx as f32 + 0.5);
            let values = dataset.below(threshold).values;

            let kde = match GaussianKde::new(&values) {
                Ok(kde) => kde,
                Err(e) => {
                    warn!("Not plotting {}: {e}", dataset.name);
                    continue;
                }
            };

            self.draw_violin(&mut canvas, &kde, center, column_w);

            if let Some(m) = median(&values) {
                let y = self.value_to_y(m);
                let half = column_w * 0.1;
                draw_line_segment_mut(&mut canvas, (center - half, y), (center + half, y), AXIS);
            }
        }

        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(padding as i32, padding as i32).of_size(plot_w, plot_h),
            AXIS,
        );

        Ok(canvas)
    }

    fn value_to_y(&self, value: f64) -> f32 {
        let plot_h = (self.config.height - 2 * self.config.padding) as f64;
        let frac = (value / self.config.threshold).clamp(0.0, 1.0);
        (self.config.padding as f64 + plot_h * (1.0 - frac)) as f32
    }

    fn draw_violin(&self, canvas: &mut RgbImage, kde: &GaussianKde, center: f32, column_w: f32) {
        let top = self.config.padding;
        let bottom = self.config.height - self.config.padding;
        let plot_h = (bottom - top) as f64;

        let rows = (top..bottom)
            .map(|y| {
                let value = self.config.threshold * (1.0 - (y - top) as f64 / plot_h);
                (y, kde.pdf(value))
            })
            .collect::<Vec<_>>();

        let peak = rows.iter().fold(0.0f64, |acc, &(_, d)| acc.max(d));
        if peak <= 0.0 {
            return;
        }

        let max_half = column_w * self.config.violin_width / 2.0;
        for (y, density) in rows {
            let half = (density / peak) as f32 * max_half;
            if half < 0.5 {
                continue;
            }
            draw_line_segment_mut(
                canvas,
                (center - half, y as f32),
                (center + half, y as f32),
                self.config.fill,
            );
        }
    }
}

impl Default for ViolinPlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-coefficient scores as an 8x8 grid of `cell`-pixel squares, blue for
/// the smallest value through red for the largest.
pub fn coefficient_heatmap(scores: &Array2<f64>, cell: u32) -> RgbImage {
    let (rows, cols) = scores.dim();
    let mut canvas = RgbImage::from_pixel(cols as u32 * cell, rows as u32 * cell, BACKGROUND);

    let finite = scores.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let range = max - min;

    for ((row, col), &value) in scores.indexed_iter() {
        let intensity = if !value.is_finite() {
            1.0
        } else if range > 1e-12 {
            ((value - min) / range) as f32
        } else {
            0.0
        };

        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(col as i32 * cell as i32, row as i32 * cell as i32).of_size(cell, cell),
            heat_color(intensity),
        );
    }

    canvas
}

fn heat_color(intensity: f32) -> Rgb<u8> {
    let intensity = intensity.clamp(0.0, 1.0);
    let (r, g, b) = if intensity < 0.25 {
        let t = intensity / 0.25;
        (0.0, t, 1.0)
    } else if intensity < 0.5 {
        let t = (intensity - 0.25) / 0.25;
        (0.0, 1.0, 1.0 - t)
    } else if intensity < 0.75 {
        let t = (intensity - 0.5) / 0.25;
        (t, 1.0, 0.0)
    } else {
        let t = (intensity - 0.75) / 0.25;
        (1.0, 1.0 - t, 0.0)
    };
    Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(center: f64, count: usize) -> Vec<f64> {
        (0..count).map(|k| center + (k % 20) as f64).collect()
    }

    #[test]
    fn test_render_draws_violins() {
        let plot = ViolinPlot::new();
        let datasets = vec![
            DatasetScores::new("a", spread(40.0, 100)),
            DatasetScores::new("b", spread(150.0, 100)),
        ];

        let image = plot.render(&datasets).unwrap();
        assert_eq!(image.dimensions(), (800, 600));

        let fill = plot.config.fill;
        assert!(image.pixels().any(|p| *p == fill));
        // frame corner
        assert_eq!(*image.get_pixel(40, 40), AXIS);
    }

    #[test]
    fn test_render_skips_degenerate_dataset() {
        let plot = ViolinPlot::new();
        let datasets = vec![DatasetScores::new("flat", vec![5.0; 10])];

        let image = plot.render(&datasets).unwrap();
        assert!(!image.pixels().any(|p| *p == plot.config.fill));
    }

    #[test]
    fn test_render_rejects_empty_input() {
        assert!(ViolinPlot::new().render(&[]).is_err());
    }

    #[test]
    fn test_coefficient_heatmap_extremes() {
        let mut scores = Array2::<f64>::zeros((8, 8));
        scores[[7, 7]] = 4.0;

        let map = coefficient_heatmap(&scores, 4);
        assert_eq!(map.dimensions(), (32, 32));
        assert_eq!(*map.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*map.get_pixel(31, 31), Rgb([255, 0, 0]));
    }
}
