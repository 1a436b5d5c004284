pub mod compose;
pub mod dither;
/// Frame transformation engine for tilemosaic.
///
/// Reduces frames to a luma grid, dithers it and stamps tiles back at full resolution.
pub mod pipeline;
pub mod reduce;
pub mod reorder;
pub mod workers;

pub use compose::MosaicComposer;
pub use dither::{ErrorDiffusionDither, OrderedDither, ditherer_for};
pub use pipeline::FramePipeline;
pub use reduce::GrayscaleReducer;
pub use workers::{in_flight_limit, run_frames};
