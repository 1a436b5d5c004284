/// Encodage de la sortie pour tilemosaic.
///
/// ffmpeg subprocess muxer and optional audio pass-through.

pub mod muxer;

pub use muxer::{Mp4Muxer, mux_audio_video};
