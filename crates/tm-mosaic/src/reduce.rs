use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use rayon::prelude::*;
use tm_core::config::Sampling;
use tm_core::error::MosaicError;
use tm_core::frame::{CHANNELS, FrameBuffer, LumaGrid, luma};

/// Réduit une frame pleine résolution en une grille de luminance, une cellule par bloc.
///
/// Rows and columns that do not fill a whole block are ignored.
///
/// # Example
/// ```
/// use tm_core::config::Sampling;
/// use tm_core::frame::FrameBuffer;
/// use tm_mosaic::reduce::GrayscaleReducer;
///
/// let reducer = GrayscaleReducer::new(Sampling::BlockMean);
/// let frame = FrameBuffer::filled(25, 20, (200, 200, 200));
/// let grid = reducer.reduce(&frame, 10).unwrap();
/// assert_eq!((grid.width, grid.height), (2, 2));
/// assert!(grid.cells.iter().all(|&v| v == 200));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct GrayscaleReducer {
    sampling: Sampling,
}

impl GrayscaleReducer {
    #[must_use]
    pub fn new(sampling: Sampling) -> Self {
        Self { sampling }
    }

    #[must_use]
    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    /// Compute the luma grid of `frame` for square blocks of `block_size`.
    ///
    /// # Errors
    /// [`MosaicError::Config`] for a zero block size, [`MosaicError::InvalidDimensions`]
    /// if the frame buffer does not match its dimensions or cannot be resampled.
    pub fn reduce(&self, frame: &FrameBuffer, block_size: u32) -> Result<LumaGrid, MosaicError> {
        if block_size == 0 {
            return Err(MosaicError::Config(
                "block_size doit être un entier positif".into(),
            ));
        }
        if !frame.is_consistent() {
            return Err(MosaicError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
            });
        }

        let (grid_w, grid_h) = LumaGrid::dims_for(frame.width, frame.height, block_size);
        if grid_w == 0 || grid_h == 0 {
            return Ok(LumaGrid::new(grid_w, grid_h));
        }

        match self.sampling {
            Sampling::Area => area_luma(frame, grid_w, grid_h),
            Sampling::BlockMean => Ok(block_mean_luma(frame, block_size, grid_w, grid_h)),
        }
    }
}

/// Whole-frame area resample to the grid size, then luma per cell.
///
/// Remainder strips take part in the resample, so edge cells blend slightly past their block.
fn area_luma(frame: &FrameBuffer, grid_w: u32, grid_h: u32) -> Result<LumaGrid, MosaicError> {
    let invalid = || MosaicError::InvalidDimensions {
        width: frame.width,
        height: frame.height,
    };

    // fast_image_resize exige un buffer source mutable : copie forcée
    let mut src_buf = frame.data.clone();
    let src = Image::from_slice_u8(frame.width, frame.height, &mut src_buf, PixelType::U8x3)
        .map_err(|_| invalid())?;
    let mut dst = Image::new(grid_w, grid_h, PixelType::U8x3);
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box));
    Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .map_err(|_| invalid())?;

    let cells = dst
        .buffer()
        .chunks_exact(CHANNELS)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();
    LumaGrid::from_cells(grid_w, grid_h, cells).ok_or_else(invalid)
}

/// Exact mean of per-pixel luma over each block, rounded to nearest.
fn block_mean_luma(frame: &FrameBuffer, block_size: u32, grid_w: u32, grid_h: u32) -> LumaGrid {
    let block = block_size as usize;
    let stride = frame.stride();
    let area = (block * block) as u64;
    let mut grid = LumaGrid::new(grid_w, grid_h);

    grid.cells
        .par_chunks_mut(grid_w as usize)
        .enumerate()
        .for_each(|(gy, row)| {
            for (gx, cell) in row.iter_mut().enumerate() {
                let x0 = gx * block * CHANNELS;
                let mut sum = 0u64;
                for y in gy * block..(gy + 1) * block {
                    let start = y * stride + x0;
                    for px in frame.data[start..start + block * CHANNELS].chunks_exact(CHANNELS) {
                        sum += u64::from(luma(px[0], px[1], px[2]));
                    }
                }
                *cell = ((sum + area / 2) / area) as u8;
            }
        });

    grid
}
