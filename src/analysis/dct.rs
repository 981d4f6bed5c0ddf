//! Direct 2-D DCT-II over small square blocks.
//!
//! The basis is built once and never mutated, so a single [`Dct`] can be
//! shared between threads behind an `Arc`.

use std::f64::consts::PI;

use ndarray::{Array2, Array4, ArrayView2};

use crate::error::{BlockinessError, Result};

pub const BLOCK_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct Dct {
    n: usize,
    phi_1d: Array2<f64>,
    phi_2d: Array4<f64>,
}

impl Dct {
    pub fn new() -> Self {
        Self::with_size(BLOCK_SIZE)
    }

    /// Basis for `n x n` blocks.
    ///
    /// `phi_2d[[i, j, m, n]] = phi_i[n] * phi_j[m]`: frequency `i` runs along
    /// block columns and frequency `j` along block rows.
    pub fn with_size(n: usize) -> Self {
        let phi_1d = Self::compute_phi_1d(n);
        let mut phi_2d = Array4::<f64>::zeros((n, n, n, n));

        for i in 0..n {
            for j in 0..n {
                for m in 0..n {
                    for col in 0..n {
                        phi_2d[[i, j, m, col]] = phi_1d[[i, col]] * phi_1d[[j, m]];
                    }
                }
            }
        }

        Self { n, phi_1d, phi_2d }
    }

    fn compute_phi_1d(n: usize) -> Array2<f64> {
        let size = n as f64;

        Array2::from_shape_fn((n, n), |(k, i)| {
            if k == 0 {
                1.0 / size.sqrt()
            } else {
                let angle = (k as f64 * PI / (2.0 * size)) * (2.0 * i as f64 + 1.0);
                (2.0 / size).sqrt() * angle.cos()
            }
        })
    }

    pub fn size(&self) -> usize {
        self.n
    }

    /// Row `k` is the 1-D basis vector of frequency `k`.
    pub fn basis_1d(&self) -> &Array2<f64> {
        &self.phi_1d
    }

    pub fn basis_2d(&self) -> &Array4<f64> {
        &self.phi_2d
    }

    pub fn transform(&self, block: ArrayView2<f64>) -> Result<Array2<f64>> {
        let (rows, cols) = block.dim();
        if rows != self.n || cols != self.n {
            return Err(BlockinessError::BlockShape {
                expected: self.n,
                rows,
                cols,
            });
        }

        let mut result = Array2::<f64>::zeros((self.n, self.n));

        for i in 0..self.n {
            for j in 0..self.n {
                let mut sum = 0.0;
                for m in 0..self.n {
                    for n in 0..self.n {
                        sum += self.phi_2d[[i, j, m, n]] * block[[m, n]];
                    }
                }
                result[[i, j]] = sum;
            }
        }

        Ok(result)
    }
}

impl Default for Dct {
    fn default() -> Self {
        Self::new()
    }
}
