use std::sync::Arc;

use rayon::prelude::*;
use tm_core::error::MosaicError;
use tm_core::frame::{CHANNELS, FrameBuffer, LumaGrid};
use tm_core::tile::TileSet;

/// Estampille une tuile par cellule de la grille dans une frame pleine résolution.
///
/// Cells strictly below the threshold get the black tile, the others the white one.
/// The output is allocated zero-filled at the source size, so remainder strips
/// on the right and bottom stay black.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tm_core::frame::LumaGrid;
/// use tm_core::tile::TileSet;
/// use tm_mosaic::compose::MosaicComposer;
///
/// let composer = MosaicComposer::new(128, Arc::new(TileSet::solid(2)));
/// let grid = LumaGrid::from_cells(2, 1, vec![0, 255]).unwrap();
/// let out = composer.compose(&grid, 5, 2).unwrap();
/// assert_eq!(out.pixel(0, 0), (0, 0, 0));
/// assert_eq!(out.pixel(3, 1), (255, 255, 255));
/// assert_eq!(out.pixel(4, 0), (0, 0, 0));
/// ```
#[derive(Clone, Debug)]
pub struct MosaicComposer {
    threshold: u8,
    tiles: Arc<TileSet>,
}

impl MosaicComposer {
    #[must_use]
    pub fn new(threshold: u8, tiles: Arc<TileSet>) -> Self {
        Self { threshold, tiles }
    }

    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    #[must_use]
    pub fn tiles(&self) -> &TileSet {
        &self.tiles
    }

    /// Build the `frame_w × frame_h` output frame for `grid`.
    ///
    /// # Errors
    /// [`MosaicError::InvalidDimensions`] if the grid does not fit in the frame.
    pub fn compose(
        &self,
        grid: &LumaGrid,
        frame_w: u32,
        frame_h: u32,
    ) -> Result<FrameBuffer, MosaicError> {
        let block = self.tiles.block_size();
        if u64::from(grid.width) * u64::from(block) > u64::from(frame_w)
            || u64::from(grid.height) * u64::from(block) > u64::from(frame_h)
        {
            return Err(MosaicError::InvalidDimensions {
                width: frame_w,
                height: frame_h,
            });
        }

        let mut out = FrameBuffer::new(frame_w, frame_h);
        if grid.is_empty() || block == 0 {
            return Ok(out);
        }

        let stride = out.stride();
        let block_px = block as usize;
        let tile_row_len = block_px * CHANNELS;

        // Une bande = block_size lignes de pixels = une ligne de la grille
        out.data
            .par_chunks_mut(block_px * stride)
            .take(grid.height as usize)
            .enumerate()
            .for_each(|(gy, band)| {
                for gx in 0..grid.width {
                    let tile = self.tiles.pick(grid.get(gx, gy as u32), self.threshold);
                    let x0 = gx as usize * tile_row_len;
                    for ty in 0..block {
                        let start = ty as usize * stride + x0;
                        band[start..start + tile_row_len].copy_from_slice(tile.row(ty));
                    }
                }
            });

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_core::tile::Tile;

    fn composer(block: u32) -> MosaicComposer {
        MosaicComposer::new(128, Arc::new(TileSet::solid(block)))
    }

    #[test]
    fn exact_cover_writes_every_pixel() {
        let grid = LumaGrid::from_cells(10, 10, vec![255; 100]).unwrap();
        let out = composer(10).compose(&grid, 100, 100).unwrap();
        assert!(out.data.iter().all(|&b| b == 255));
    }

    #[test]
    fn remainder_strip_stays_zero() {
        let grid = LumaGrid::from_cells(10, 10, vec![255; 100]).unwrap();
        let out = composer(10).compose(&grid, 105, 105).unwrap();
        for y in 0..105 {
            for x in 0..105 {
                let expected = if x < 100 && y < 100 { 255 } else { 0 };
                assert_eq!(out.pixel(x, y), (expected, expected, expected), "({x}, {y})");
            }
        }
    }

    #[test]
    fn threshold_tie_selects_white() {
        let grid = LumaGrid::from_cells(3, 1, vec![127, 128, 129]).unwrap();
        let out = composer(1).compose(&grid, 3, 1).unwrap();
        assert_eq!(out.data, vec![0, 0, 0, 255, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn tiles_are_copied_pixel_for_pixel() {
        let mut pattern = FrameBuffer::new(2, 2);
        pattern.data.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        let black = Tile::new(pattern, 2).unwrap();
        let white = Tile::solid(2, (200, 200, 200));
        let tiles = Arc::new(TileSet::new(black, white).unwrap());
        let grid = LumaGrid::from_cells(2, 1, vec![255, 0]).unwrap();
        let out = MosaicComposer::new(128, tiles).compose(&grid, 4, 2).unwrap();
        assert_eq!(out.pixel(0, 0), (200, 200, 200));
        assert_eq!(out.pixel(2, 0), (1, 2, 3));
        assert_eq!(out.pixel(3, 1), (10, 11, 12));
    }

    #[test]
    fn grid_larger_than_frame_is_rejected() {
        let grid = LumaGrid::new(3, 3);
        assert!(matches!(
            composer(10).compose(&grid, 20, 30),
            Err(MosaicError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn empty_grid_gives_black_frame() {
        let grid = LumaGrid::new(0, 4);
        let out = composer(10).compose(&grid, 5, 40).unwrap();
        assert!(out.data.iter().all(|&b| b == 0));
        assert_eq!(out.data.len(), 5 * 40 * 3);
    }
}
