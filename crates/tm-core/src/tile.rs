use crate::error::MosaicError;
use crate::frame::FrameBuffer;

/// Image carrée `block_size × block_size` estampillée dans chaque bloc.
///
/// Construction checks the dimensions, so stamping never reads past a row.
///
/// # Example
/// ```
/// use tm_core::frame::FrameBuffer;
/// use tm_core::tile::Tile;
/// let tile = Tile::new(FrameBuffer::new(8, 8), 8).unwrap();
/// assert_eq!(tile.size(), 8);
/// assert!(Tile::new(FrameBuffer::new(8, 4), 8).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct Tile {
    pixels: FrameBuffer,
}

impl Tile {
    /// Wrap `pixels` as a tile for blocks of `block_size`.
    ///
    /// # Errors
    /// [`MosaicError::TileSize`] if the image is not exactly `block_size × block_size`,
    /// [`MosaicError::InvalidDimensions`] if the buffer length does not match its dimensions.
    pub fn new(pixels: FrameBuffer, block_size: u32) -> Result<Self, MosaicError> {
        if !pixels.is_consistent() {
            return Err(MosaicError::InvalidDimensions {
                width: pixels.width,
                height: pixels.height,
            });
        }
        if pixels.width != block_size || pixels.height != block_size {
            return Err(MosaicError::TileSize {
                width: pixels.width,
                height: pixels.height,
                block_size,
            });
        }
        Ok(Self { pixels })
    }

    /// Solid color tile.
    #[must_use]
    pub fn solid(block_size: u32, rgb: (u8, u8, u8)) -> Self {
        Self {
            pixels: FrameBuffer::filled(block_size, block_size, rgb),
        }
    }

    /// Side length in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.pixels.width
    }

    /// Row `y` of the tile as raw RGB bytes.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.pixels.stride();
        let start = y as usize * stride;
        &self.pixels.data[start..start + stride]
    }

    #[must_use]
    pub fn pixels(&self) -> &FrameBuffer {
        &self.pixels
    }
}

/// Les deux tuiles d'un run. Immuable, partagée entre workers.
#[derive(Clone, Debug)]
pub struct TileSet {
    /// Stamped where the cell is below the threshold.
    pub black: Tile,
    /// Stamped everywhere else.
    pub white: Tile,
}

impl TileSet {
    /// Pair two tiles, checking they share the same size.
    ///
    /// # Errors
    /// [`MosaicError::TilePair`] if the sizes differ.
    pub fn new(black: Tile, white: Tile) -> Result<Self, MosaicError> {
        if black.pixels.width != white.pixels.width || black.pixels.height != white.pixels.height {
            return Err(MosaicError::TilePair {
                black_width: black.pixels.width,
                black_height: black.pixels.height,
                white_width: white.pixels.width,
                white_height: white.pixels.height,
            });
        }
        Ok(Self { black, white })
    }

    /// Pure black / pure white pair.
    ///
    /// # Example
    /// ```
    /// use tm_core::tile::TileSet;
    /// let tiles = TileSet::solid(4);
    /// assert_eq!(tiles.block_size(), 4);
    /// assert_eq!(tiles.white.row(0), &[255u8; 12][..]);
    /// ```
    #[must_use]
    pub fn solid(block_size: u32) -> Self {
        Self {
            black: Tile::solid(block_size, (0, 0, 0)),
            white: Tile::solid(block_size, (255, 255, 255)),
        }
    }

    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.black.size()
    }

    /// Tile for a cell value: black strictly below `threshold`, white otherwise.
    #[inline]
    #[must_use]
    pub fn pick(&self, value: u8, threshold: u8) -> &Tile {
        if value < threshold {
            &self.black
        } else {
            &self.white
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_ties_go_to_white() {
        let tiles = TileSet::solid(2);
        assert_eq!(tiles.pick(128, 128).row(0)[0], 255);
        assert_eq!(tiles.pick(127, 128).row(0)[0], 0);
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let black = Tile::solid(4, (0, 0, 0));
        let white = Tile::solid(5, (255, 255, 255));
        let err = TileSet::new(black, white).unwrap_err();
        assert!(matches!(
            err,
            MosaicError::TilePair {
                black_width: 4,
                black_height: 4,
                white_width: 5,
                white_height: 5,
            }
        ));
        assert!(err.to_string().contains("noire 4×4, blanche 5×5"));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.data.truncate(10);
        assert!(matches!(
            Tile::new(fb, 4),
            Err(MosaicError::InvalidDimensions { .. })
        ));
    }
}
