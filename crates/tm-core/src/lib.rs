/// Configuration, types, and shared structures for tilemosaic.
///
/// This crate contains all shared types, traits, and configuration logic
/// used across the tilemosaic workspace.

pub mod config;
pub mod error;
pub mod frame;
pub mod tile;
pub mod traits;

pub use config::{AppConfig, DitherMode, MosaicConfig};
pub use error::MosaicError;
pub use frame::{FrameBuffer, LumaGrid, SourceFrame};
pub use tile::{Tile, TileSet};
