use std::path::Path;

use image::RgbImage;
use image::imageops::{self, FilterType};
use tm_core::config::TileFit;
use tm_core::error::MosaicError;
use tm_core::frame::FrameBuffer;
use tm_core::tile::{Tile, TileSet};

/// Charge une image de tuile depuis le disque, convertie en RGB24.
///
/// # Errors
/// [`MosaicError::AssetLoad`] si le fichier est absent ou illisible.
pub fn load_tile_image(path: &Path) -> Result<RgbImage, MosaicError> {
    let img = image::open(path).map_err(|e| MosaicError::AssetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(MosaicError::AssetLoad {
            path: path.to_path_buf(),
            reason: "image vide".into(),
        });
    }
    Ok(rgb)
}

/// Turn a decoded image into a tile for `block_size` according to `fit`.
///
/// `TileFit::Resize` uses nearest-neighbour so hard pixel edges survive.
///
/// # Errors
/// [`MosaicError::TileSize`] under `TileFit::Strict` when the size differs.
pub fn fit_tile(img: RgbImage, block_size: u32, fit: TileFit) -> Result<Tile, MosaicError> {
    let (w, h) = img.dimensions();
    let img = if (w, h) == (block_size, block_size) {
        img
    } else {
        match fit {
            TileFit::Strict => {
                return Err(MosaicError::TileSize {
                    width: w,
                    height: h,
                    block_size,
                });
            }
            TileFit::Resize => {
                log::info!("Tuile {w}x{h} redimensionnée en {block_size}x{block_size}");
                imageops::resize(&img, block_size, block_size, FilterType::Nearest)
            }
        }
    };
    let (width, height) = img.dimensions();
    Tile::new(
        FrameBuffer {
            data: img.into_raw(),
            width,
            height,
        },
        block_size,
    )
}

/// Load the black/white tile pair once for the whole run.
///
/// # Errors
/// [`MosaicError::AssetLoad`] for unreadable files, [`MosaicError::TileSize`] for
/// mismatched sizes under `TileFit::Strict`, [`MosaicError::Config`] for a zero block size.
pub fn load_tiles(
    black: &Path,
    white: &Path,
    block_size: u32,
    fit: TileFit,
) -> Result<TileSet, MosaicError> {
    if block_size == 0 {
        return Err(MosaicError::Config(
            "block_size doit être un entier positif".into(),
        ));
    }
    let black_tile = fit_tile(load_tile_image(black)?, block_size, fit)?;
    let white_tile = fit_tile(load_tile_image(white)?, block_size, fit)?;
    TileSet::new(black_tile, white_tile)
}
