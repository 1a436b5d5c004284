use std::sync::Arc;

use tm_core::config::MosaicConfig;
use tm_core::error::MosaicError;
use tm_core::frame::{FrameBuffer, SourceFrame};
use tm_core::tile::TileSet;
use tm_core::traits::Dither;

use crate::compose::MosaicComposer;
use crate::dither::ditherer_for;
use crate::reduce::GrayscaleReducer;

/// Chaîne complète d'une frame : réduction → tramage (optionnel) → composition.
///
/// Immuable après construction et partageable entre workers (`Sync`).
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tm_core::config::MosaicConfig;
/// use tm_core::frame::{FrameBuffer, SourceFrame};
/// use tm_core::tile::TileSet;
/// use tm_mosaic::pipeline::FramePipeline;
///
/// let config = MosaicConfig { block_size: 10, ..MosaicConfig::default() };
/// let pipeline = FramePipeline::new(config, Arc::new(TileSet::solid(10))).unwrap();
/// let input = SourceFrame { index: 0, pts_secs: 0.0, frame: FrameBuffer::filled(20, 20, (200, 200, 200)) };
/// let out = pipeline.process(&input).unwrap();
/// assert!(out.data.iter().all(|&b| b == 255));
/// ```
pub struct FramePipeline {
    config: MosaicConfig,
    reducer: GrayscaleReducer,
    ditherer: Option<Box<dyn Dither>>,
    composer: MosaicComposer,
}

impl FramePipeline {
    /// Validate `config` against `tiles` and build the per-frame stages.
    ///
    /// # Errors
    /// [`MosaicError::Config`] for an invalid configuration, [`MosaicError::TileSize`]
    /// when the tiles are not `block_size × block_size`.
    pub fn new(config: MosaicConfig, tiles: Arc<TileSet>) -> Result<Self, MosaicError> {
        config.validate()?;
        if tiles.block_size() != config.block_size {
            return Err(MosaicError::TileSize {
                width: tiles.block_size(),
                height: tiles.block_size(),
                block_size: config.block_size,
            });
        }

        let ditherer = ditherer_for(config.dither_mode);
        log::debug!(
            "FramePipeline: bloc {}, seuil {}, tramage {}, échantillonnage {:?}",
            config.block_size,
            config.threshold,
            ditherer.as_ref().map_or("none", |d| d.name()),
            config.sampling
        );

        Ok(Self {
            reducer: GrayscaleReducer::new(config.sampling),
            ditherer,
            composer: MosaicComposer::new(config.threshold, tiles),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Transform one decoded frame into its mosaic, at the same size.
    ///
    /// # Errors
    /// [`MosaicError::FrameDecode`] if the frame buffer is inconsistent with its dimensions.
    pub fn process(&self, input: &SourceFrame) -> Result<FrameBuffer, MosaicError> {
        let frame = &input.frame;
        if !frame.is_consistent() {
            return Err(MosaicError::FrameDecode {
                index: input.index,
                reason: format!(
                    "buffer de {} octets pour {}x{}",
                    frame.data.len(),
                    frame.width,
                    frame.height
                ),
            });
        }

        let mut grid = self.reducer.reduce(frame, self.config.block_size)?;
        if let Some(ditherer) = &self.ditherer {
            ditherer.dither(&mut grid);
        }
        self.composer.compose(&grid, frame.width, frame.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_core::config::{DitherMode, Sampling};

    fn source(frame: FrameBuffer) -> SourceFrame {
        SourceFrame {
            index: 3,
            pts_secs: 0.1,
            frame,
        }
    }

    fn pipeline(mode: DitherMode, block: u32) -> FramePipeline {
        let config = MosaicConfig {
            block_size: block,
            dither_mode: mode,
            sampling: Sampling::BlockMean,
            ..MosaicConfig::default()
        };
        FramePipeline::new(config, Arc::new(TileSet::solid(block))).unwrap()
    }

    #[test]
    fn output_keeps_input_size() {
        for mode in [
            DitherMode::None,
            DitherMode::Ordered,
            DitherMode::ErrorDiffusion,
        ] {
            let out = pipeline(mode, 4)
                .process(&source(FrameBuffer::filled(18, 10, (90, 90, 90))))
                .unwrap();
            assert_eq!((out.width, out.height), (18, 10));
            assert!(out.is_consistent());
        }
    }

    #[test]
    fn dark_frame_without_dither_is_black() {
        let out = pipeline(DitherMode::None, 5)
            .process(&source(FrameBuffer::filled(20, 20, (40, 40, 40))))
            .unwrap();
        assert!(out.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn ordered_dither_breaks_up_midtones() {
        let out = pipeline(DitherMode::Ordered, 1)
            .process(&source(FrameBuffer::filled(8, 8, (100, 100, 100))))
            .unwrap();
        let white = out.data.chunks_exact(3).filter(|px| px[0] == 255).count();
        assert!(white > 0 && white < 64);
    }

    #[test]
    fn tile_size_mismatch_is_rejected() {
        let config = MosaicConfig {
            block_size: 8,
            ..MosaicConfig::default()
        };
        assert!(matches!(
            FramePipeline::new(config, Arc::new(TileSet::solid(4))),
            Err(MosaicError::TileSize { .. })
        ));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let config = MosaicConfig {
            block_size: 0,
            ..MosaicConfig::default()
        };
        assert!(matches!(
            FramePipeline::new(config, Arc::new(TileSet::solid(0))),
            Err(MosaicError::Config(_))
        ));
    }

    #[test]
    fn inconsistent_frame_is_decode_error() {
        let mut frame = FrameBuffer::new(10, 10);
        frame.data.truncate(50);
        let err = pipeline(DitherMode::None, 5)
            .process(&source(frame))
            .unwrap_err();
        assert!(matches!(err, MosaicError::FrameDecode { index: 3, .. }));
    }
}
