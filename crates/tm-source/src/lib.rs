/// Frame and tile sources for tilemosaic (ffmpeg video pipe, in-memory frames, tile images).

pub mod memory;
pub mod tile;
pub mod video;

pub use memory::MemorySource;
pub use tile::load_tiles;
pub use video::{VideoSource, probe_video};
