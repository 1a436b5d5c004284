//! Tramage binaire de la grille de luminance.
//! Deux variantes : ordonné (Bayer 4x4, parallèle par ligne) et diffusion d'erreur
//! (Floyd–Steinberg, balayage séquentiel).

use rayon::prelude::*;
use tm_core::config::DitherMode;
use tm_core::frame::LumaGrid;
use tm_core::traits::Dither;

/// Matrice de Bayer 4x4. Normalisée sur 16 niveaux (0-15).
pub const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Scale from matrix levels to 8-bit thresholds: `256 / 17`, truncated.
pub const BAYER_SCALE: u16 = 256 / 17;

/// Noyau Floyd–Steinberg : (dx, dy, poids sur 16).
pub const FLOYD_STEINBERG: [(isize, usize, f32); 4] =
    [(1, 0, 7.0), (-1, 1, 3.0), (0, 1, 5.0), (1, 1, 1.0)];

/// Above this the working value quantizes to 255, otherwise to 0.
pub const DIFFUSION_MIDPOINT: f32 = 127.0;

/// Tramage ordonné par seuil de Bayer.
///
/// A cell becomes 255 when its value is strictly greater than `matrix[y % 4][x % 4] × 15`.
/// Each cell depends only on its own value and position.
///
/// # Example
/// ```
/// use tm_core::frame::LumaGrid;
/// use tm_core::traits::Dither;
/// use tm_mosaic::dither::OrderedDither;
///
/// let mut grid = LumaGrid::from_cells(4, 1, vec![1, 1, 1, 1]).unwrap();
/// OrderedDither::default().dither(&mut grid);
/// assert_eq!(grid.cells, vec![255, 0, 0, 0]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct OrderedDither {
    matrix: [[u8; 4]; 4],
}

impl OrderedDither {
    #[must_use]
    pub fn new(matrix: [[u8; 4]; 4]) -> Self {
        Self { matrix }
    }

    /// Seuil 8 bits pour la cellule (x, y).
    #[inline]
    #[must_use]
    pub fn threshold_at(&self, x: usize, y: usize) -> u16 {
        u16::from(self.matrix[y % 4][x % 4]) * BAYER_SCALE
    }
}

impl Default for OrderedDither {
    fn default() -> Self {
        Self::new(BAYER_4X4)
    }
}

impl Dither for OrderedDither {
    fn dither(&self, grid: &mut LumaGrid) {
        if grid.is_empty() {
            return;
        }
        grid.cells
            .par_chunks_mut(grid.width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = if u16::from(*cell) > self.threshold_at(x, y) {
                        255
                    } else {
                        0
                    };
                }
            });
    }

    fn name(&self) -> &'static str {
        "ordered"
    }
}

/// Diffusion d'erreur Floyd–Steinberg, balayage ligne par ligne de gauche à droite.
///
/// Errors are carried in an `f32` working buffer so the accumulated value of a cell
/// may leave `[0, 255]` before it is quantized. The scan is sequential by nature.
///
/// # Example
/// ```
/// use tm_core::frame::LumaGrid;
/// use tm_core::traits::Dither;
/// use tm_mosaic::dither::ErrorDiffusionDither;
///
/// let mut grid = LumaGrid::from_cells(4, 1, vec![100, 100, 100, 100]).unwrap();
/// ErrorDiffusionDither.dither(&mut grid);
/// assert_eq!(grid.cells, vec![0, 255, 0, 0]);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorDiffusionDither;

/// Range of working values seen just before quantization.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ValueRange {
    min: f32,
    max: f32,
}

/// Spread `error` from (x, y) to the in-bounds neighbours of the kernel.
fn spread_error(work: &mut [f32], width: usize, height: usize, x: usize, y: usize, error: f32) {
    for &(dx, dy, weight) in &FLOYD_STEINBERG {
        let Some(nx) = x.checked_add_signed(dx) else {
            continue;
        };
        let ny = y + dy;
        if nx >= width || ny >= height {
            continue;
        }
        work[ny * width + nx] += error * weight / 16.0;
    }
}

/// Quantize `work` in scan order, spreading each residual forward.
fn diffuse(work: &mut [f32], width: usize, height: usize) -> ValueRange {
    let mut range = ValueRange {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = work[idx];
            range.min = range.min.min(old);
            range.max = range.max.max(old);
            let new = if old > DIFFUSION_MIDPOINT { 255.0 } else { 0.0 };
            work[idx] = new;
            spread_error(work, width, height, x, y, old - new);
        }
    }
    range
}

impl Dither for ErrorDiffusionDither {
    fn dither(&self, grid: &mut LumaGrid) {
        if grid.is_empty() {
            return;
        }
        let (width, height) = (grid.width as usize, grid.height as usize);
        let mut work: Vec<f32> = grid.cells.iter().map(|&v| f32::from(v)).collect();
        let range = diffuse(&mut work, width, height);
        log::trace!(
            "{} : plage avant quantification [{:.1}, {:.1}]",
            self.name(),
            range.min,
            range.max
        );
        for (cell, v) in grid.cells.iter_mut().zip(work) {
            *cell = if v > DIFFUSION_MIDPOINT { 255 } else { 0 };
        }
    }

    fn name(&self) -> &'static str {
        "error-diffusion"
    }
}

/// Ditherer for `mode`, `None` when the grid should be thresholded directly.
#[must_use]
pub fn ditherer_for(mode: DitherMode) -> Option<Box<dyn Dither>> {
    match mode {
        DitherMode::None => None,
        DitherMode::Ordered => Some(Box::new(OrderedDither::default())),
        DitherMode::ErrorDiffusion => Some(Box::new(ErrorDiffusionDither)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grille pseudo-aléatoire déterministe (LCG).
    fn noise_grid(width: u32, height: u32, seed: u32) -> LumaGrid {
        let mut state = seed;
        let cells = (0..width * height)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect();
        LumaGrid::from_cells(width, height, cells).unwrap()
    }

    #[test]
    fn kernel_weights_sum_to_sixteen() {
        let total: f32 = FLOYD_STEINBERG.iter().map(|k| k.2).sum();
        assert!((total - 16.0).abs() < f32::EPSILON);
    }

    #[test]
    fn bayer_matrix_is_a_permutation() {
        let mut seen: Vec<u8> = BAYER_4X4.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn ordered_thresholds_follow_matrix() {
        let d = OrderedDither::default();
        assert_eq!(d.threshold_at(0, 0), 0);
        assert_eq!(d.threshold_at(1, 0), 120);
        assert_eq!(d.threshold_at(0, 3), 225);
        assert_eq!(d.threshold_at(4, 4), d.threshold_at(0, 0));
    }

    #[test]
    fn ordered_is_deterministic() {
        let base = noise_grid(37, 23, 7);
        let mut a = base.clone();
        let mut b = base;
        OrderedDither::default().dither(&mut a);
        OrderedDither::default().dither(&mut b);
        assert_eq!(a, b);
        assert!(a.is_binary());
    }

    #[test]
    fn ordered_strict_comparison_at_zero() {
        let mut grid = LumaGrid::from_cells(1, 1, vec![0]).unwrap();
        OrderedDither::default().dither(&mut grid);
        assert_eq!(grid.cells, vec![0]);
    }

    #[test]
    fn error_diffusion_row_example() {
        let mut grid = LumaGrid::from_cells(4, 1, vec![100; 4]).unwrap();
        ErrorDiffusionDither.dither(&mut grid);
        assert_eq!(grid.cells, vec![0, 255, 0, 0]);
    }

    #[test]
    fn binary_grids_are_fixed_points() {
        let mut grid = noise_grid(16, 9, 3);
        for v in &mut grid.cells {
            *v = if *v > 127 { 255 } else { 0 };
        }
        let dithers: [&dyn Dither; 2] = [&OrderedDither::default(), &ErrorDiffusionDither];
        for d in dithers {
            let mut out = grid.clone();
            d.dither(&mut out);
            assert_eq!(out, grid, "{}", d.name());
        }
    }

    #[test]
    fn interior_error_is_fully_distributed() {
        let mut work = vec![0.0f32; 9];
        spread_error(&mut work, 3, 3, 1, 1, 100.0);
        let total: f32 = work.iter().sum();
        assert!((total - 100.0).abs() < 1e-4);
        assert!((work[5] - 43.75).abs() < 1e-4);
        assert!((work[6] - 18.75).abs() < 1e-4);
        assert!((work[7] - 31.25).abs() < 1e-4);
        assert!((work[8] - 6.25).abs() < 1e-4);
    }

    #[test]
    fn edge_error_is_dropped_out_of_bounds() {
        let mut work = vec![0.0f32; 4];
        spread_error(&mut work, 2, 2, 1, 1, 64.0);
        assert!(work.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn working_values_stay_bounded() {
        for seed in 0..8 {
            let grid = noise_grid(64, 48, seed);
            let mut work: Vec<f32> = grid.cells.iter().map(|&v| f32::from(v)).collect();
            let range = diffuse(&mut work, 64, 48);
            assert!(range.min >= -128.0 - 1e-3, "min {}", range.min);
            assert!(range.max <= 383.0 + 1e-3, "max {}", range.max);
        }
    }

    #[test]
    fn error_diffusion_output_is_binary() {
        let mut grid = noise_grid(31, 17, 11);
        ErrorDiffusionDither.dither(&mut grid);
        assert!(grid.is_binary());
    }

    #[test]
    fn mode_mapping() {
        assert!(ditherer_for(DitherMode::None).is_none());
        assert_eq!(
            ditherer_for(DitherMode::Ordered).map(|d| d.name()),
            Some("ordered")
        );
        assert_eq!(
            ditherer_for(DitherMode::ErrorDiffusion).map(|d| d.name()),
            Some("error-diffusion")
        );
    }

    #[test]
    fn empty_grid_is_untouched() {
        let mut grid = LumaGrid::new(0, 4);
        OrderedDither::default().dither(&mut grid);
        ErrorDiffusionDither.dither(&mut grid);
        assert!(grid.is_empty());
    }
}
