use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a mosaic run.
///
/// Every variant is fatal: there is no retry or skip path, the run stops
/// and the binary exits non-zero.
#[derive(Error, Debug)]
pub enum MosaicError {
    /// Invalid configuration value (CLI argument or config file).
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Input video cannot be opened or probed.
    #[error("Impossible d'ouvrir la vidéo {path} : {reason}")]
    SourceOpen {
        /// Input path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Tile image missing or malformed.
    #[error("Impossible de charger la tuile {path} : {reason}")]
    AssetLoad {
        /// Tile path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Tile dimensions do not match the block size.
    #[error("Tuile {width}×{height} incompatible avec des blocs de {block_size}×{block_size}")]
    TileSize {
        /// Tile width.
        width: u32,
        /// Tile height.
        height: u32,
        /// Configured block size.
        block_size: u32,
    },

    /// The black and white tiles do not share the same size.
    #[error("Tuiles de tailles différentes : noire {black_width}×{black_height}, blanche {white_width}×{white_height}")]
    TilePair {
        /// Black tile width.
        black_width: u32,
        /// Black tile height.
        black_height: u32,
        /// White tile width.
        white_width: u32,
        /// White tile height.
        white_height: u32,
    },

    /// Output stream cannot be created.
    #[error("Impossible de créer la sortie {path} : {reason}")]
    SinkOpen {
        /// Output path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Writing to an already opened output stream failed.
    #[error("Erreur d'écriture de la sortie : {0}")]
    Sink(String),

    /// Malformed or truncated frame coming from the source.
    #[error("Frame {index} invalide : {reason}")]
    FrameDecode {
        /// Input sequence number of the frame.
        index: u64,
        /// What went wrong.
        reason: String,
    },

    /// A pipeline thread could not be started or stopped abnormally.
    #[error("Thread de traitement : {0}")]
    Worker(String),

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },
}
