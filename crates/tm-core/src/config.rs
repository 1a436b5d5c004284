use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MosaicError;

/// Dithering applied to the luma grid before tiling.
///
/// # Example
/// ```
/// use tm_core::config::DitherMode;
/// assert_eq!(DitherMode::from_choice(2), DitherMode::ErrorDiffusion);
/// assert_eq!(DitherMode::from_choice(7), DitherMode::None);
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum DitherMode {
    /// Seuillage direct, pas de tramage.
    #[default]
    None,
    /// Bayer 4×4 ordered dithering.
    #[serde(alias = "Bayer")]
    Ordered,
    /// Floyd–Steinberg error diffusion.
    #[serde(alias = "FloydSteinberg")]
    ErrorDiffusion,
}

impl DitherMode {
    /// Map the numeric menu choice (0, 1, 2) to a mode.
    ///
    /// Anything outside the menu falls back to [`DitherMode::None`].
    #[must_use]
    pub fn from_choice(choice: u32) -> Self {
        match choice {
            1 => Self::Ordered,
            2 => Self::ErrorDiffusion,
            0 => Self::None,
            other => {
                log::warn!("Mode de tramage inconnu '{other}', pas de tramage.");
                Self::None
            }
        }
    }

    /// Lenient parse accepting menu numbers and common names.
    ///
    /// Unrecognized input falls back to [`DitherMode::None`].
    ///
    /// # Example
    /// ```
    /// use tm_core::config::DitherMode;
    /// assert_eq!(DitherMode::parse_lenient("bayer"), DitherMode::Ordered);
    /// assert_eq!(DitherMode::parse_lenient(" FS "), DitherMode::ErrorDiffusion);
    /// assert_eq!(DitherMode::parse_lenient("sierra"), DitherMode::None);
    /// ```
    #[must_use]
    pub fn parse_lenient(input: &str) -> Self {
        let s = input.trim().to_ascii_lowercase();
        if let Ok(n) = s.parse::<u32>() {
            return Self::from_choice(n);
        }
        match s.as_str() {
            "none" | "off" => Self::None,
            "ordered" | "bayer" => Self::Ordered,
            "error-diffusion" | "error_diffusion" | "errordiffusion" | "floyd-steinberg"
            | "floydsteinberg" | "fs" => Self::ErrorDiffusion,
            _ => {
                log::warn!("Mode de tramage inconnu '{input}', pas de tramage.");
                Self::None
            }
        }
    }

    /// Human readable label used in menus and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "No dithering",
            Self::Ordered => "Ordered dithering",
            Self::ErrorDiffusion => "Error-diffusion dithering",
        }
    }
}

/// How a frame is reduced to one luma sample per block.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Sampling {
    /// Area-weighted resize of the whole frame to grid size, then luma.
    #[default]
    Area,
    /// Exact mean luma of each full block; remainder strips are ignored.
    BlockMean,
}

/// What to do with tiles whose size differs from the block size.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum TileFit {
    /// Reject mismatched tiles.
    #[default]
    Strict,
    /// Resize tiles once at load time (nearest neighbour).
    Resize,
}

/// Parameters of the per-frame transformation.
///
/// # Example
/// ```
/// use tm_core::config::MosaicConfig;
/// let config = MosaicConfig::default();
/// assert_eq!(config.block_size, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MosaicConfig {
    /// Taille d'un bloc en pixels (carré).
    pub block_size: u32,
    /// Cells strictly below this value get the black tile.
    pub threshold: u8,
    /// Dithering applied before tiling.
    pub dither_mode: DitherMode,
    /// Downsampling method.
    pub sampling: Sampling,
    /// Tile size policy.
    pub tile_fit: TileFit,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            block_size: 10,
            threshold: 128,
            dither_mode: DitherMode::None,
            sampling: Sampling::Area,
            tile_fit: TileFit::Strict,
        }
    }
}

impl MosaicConfig {
    /// Check invariants that the frame pipeline relies on.
    ///
    /// # Errors
    /// Returns [`MosaicError::Config`] if `block_size` is zero.
    pub fn validate(&self) -> Result<(), MosaicError> {
        if self.block_size == 0 {
            return Err(MosaicError::Config(
                "block_size doit être un entier positif".into(),
            ));
        }
        Ok(())
    }
}

/// Réglages de l'encodeur ffmpeg.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EncoderConfig {
    /// ffmpeg video codec (`-c:v`).
    pub codec: String,
    /// Constant rate factor [0, 51].
    pub crf: u8,
    /// Encoder preset.
    pub preset: String,
    /// Output pixel format.
    pub pix_fmt: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".into(),
            crf: 18,
            preset: "medium".into(),
            pix_fmt: "yuv420p".into(),
        }
    }
}

impl EncoderConfig {
    /// True when the output pixel format subsamples chroma by two in both axes.
    #[must_use]
    pub fn is_chroma_subsampled(&self) -> bool {
        self.pix_fmt.contains("420")
    }
}

/// Execution settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Worker threads. 0 = available parallelism.
    pub workers: usize,
    /// Copy the input audio track into the output.
    pub keep_audio: bool,
}

impl RuntimeConfig {
    /// Resolve `workers == 0` to the machine's available parallelism.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

/// Configuration complète d'un run.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    pub mosaic: MosaicConfig,
    pub encoder: EncoderConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Clamp numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.encoder.crf = self.encoder.crf.min(51);
        self.runtime.workers = self.runtime.workers.min(256);
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    mosaic: Option<MosaicSection>,
    encoder: Option<EncoderSection>,
    runtime: Option<RuntimeSection>,
}

#[derive(Deserialize)]
struct MosaicSection {
    block_size: Option<u32>,
    threshold: Option<u8>,
    dither_mode: Option<DitherSetting>,
    sampling: Option<Sampling>,
    tile_fit: Option<TileFit>,
}

/// `dither_mode` tel qu'écrit dans le fichier : nom libre ou numéro du menu.
#[derive(Deserialize)]
#[serde(untagged)]
enum DitherSetting {
    Name(String),
    Choice(i64),
}

impl DitherSetting {
    fn resolve(self) -> DitherMode {
        match self {
            Self::Name(name) => DitherMode::parse_lenient(&name),
            Self::Choice(n) => u32::try_from(n).map_or_else(
                |_| {
                    log::warn!("Mode de tramage inconnu '{n}', pas de tramage.");
                    DitherMode::None
                },
                DitherMode::from_choice,
            ),
        }
    }
}

#[derive(Deserialize)]
struct EncoderSection {
    codec: Option<String>,
    crf: Option<u8>,
    preset: Option<String>,
    pix_fmt: Option<String>,
}

#[derive(Deserialize)]
struct RuntimeSection {
    workers: Option<usize>,
    keep_audio: Option<bool>,
}

/// Parse TOML text and merge it onto the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
///
/// # Example
/// ```
/// use tm_core::config::{parse_config, DitherMode};
/// let config = parse_config("[mosaic]\nblock_size = 8\ndither_mode = \"Ordered\"\n").unwrap();
/// assert_eq!(config.mosaic.block_size, 8);
/// assert_eq!(config.mosaic.dither_mode, DitherMode::Ordered);
/// assert_eq!(config.mosaic.threshold, 128);
/// ```
pub fn parse_config(text: &str) -> Result<AppConfig> {
    parse_config_file(text).map(|loaded| loaded.config)
}

/// Config parsed from a file, with the keys that callers treat as "explicitly chosen".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: AppConfig,
    /// True when the file contains `mosaic.dither_mode`.
    pub dither_mode_set: bool,
}

/// Like [`parse_config`], also reporting which optional keys were present.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
pub fn parse_config_file(text: &str) -> Result<LoadedConfig> {
    let file: ConfigFile = toml::from_str(text).context("Erreur de parsing TOML")?;
    let mut config = AppConfig::default();
    let mut dither_mode_set = false;

    if let Some(m) = file.mosaic {
        if let Some(v) = m.block_size {
            config.mosaic.block_size = v;
        }
        if let Some(v) = m.threshold {
            config.mosaic.threshold = v;
        }
        if let Some(v) = m.dither_mode {
            config.mosaic.dither_mode = v.resolve();
            dither_mode_set = true;
        }
        if let Some(v) = m.sampling {
            config.mosaic.sampling = v;
        }
        if let Some(v) = m.tile_fit {
            config.mosaic.tile_fit = v;
        }
    }

    if let Some(e) = file.encoder {
        if let Some(v) = e.codec {
            config.encoder.codec = v;
        }
        if let Some(v) = e.crf {
            config.encoder.crf = v;
        }
        if let Some(v) = e.preset {
            config.encoder.preset = v;
        }
        if let Some(v) = e.pix_fmt {
            config.encoder.pix_fmt = v;
        }
    }

    if let Some(r) = file.runtime {
        if let Some(v) = r.workers {
            config.runtime.workers = v;
        }
        if let Some(v) = r.keep_audio {
            config.runtime.keep_audio = v;
        }
    }

    config.clamp_all();
    Ok(LoadedConfig {
        config,
        dither_mode_set,
    })
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    load_config_file(path).map(|loaded| loaded.config)
}

/// Charge un fichier TOML en indiquant les clés explicitement renseignées.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<LoadedConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config_file(&content).with_context(|| format!("Config invalide : {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn crf_is_clamped() {
        let config = parse_config("[encoder]\ncrf = 90\n").unwrap();
        assert_eq!(config.encoder.crf, 51);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        assert!(parse_config("[mosaic]\nthreshold = 300\n").is_err());
    }

    #[test]
    fn zero_block_size_fails_validation() {
        let config = parse_config("[mosaic]\nblock_size = 0\n").unwrap();
        assert!(matches!(
            config.mosaic.validate(),
            Err(MosaicError::Config(_))
        ));
    }

    #[test]
    fn dither_aliases_deserialize() {
        let config = parse_config("[mosaic]\ndither_mode = \"FloydSteinberg\"\n").unwrap();
        assert_eq!(config.mosaic.dither_mode, DitherMode::ErrorDiffusion);
    }

    #[test]
    fn file_dither_modes_are_lenient() {
        let mode = |value: &str| {
            parse_config(&format!("[mosaic]\ndither_mode = {value}\n"))
                .unwrap()
                .mosaic
                .dither_mode
        };
        assert_eq!(mode("\"Sierra\""), DitherMode::None);
        assert_eq!(mode("\"ordered\""), DitherMode::Ordered);
        assert_eq!(mode("\"ErrorDiffusion\""), DitherMode::ErrorDiffusion);
        assert_eq!(mode("2"), DitherMode::ErrorDiffusion);
        assert_eq!(mode("1"), DitherMode::Ordered);
        assert_eq!(mode("-3"), DitherMode::None);
    }

    #[test]
    fn presence_of_dither_mode_is_reported() {
        assert!(!parse_config_file("[runtime]\nworkers = 2\n").unwrap().dither_mode_set);
        let loaded = parse_config_file("[mosaic]\ndither_mode = \"Sierra\"\n").unwrap();
        assert!(loaded.dither_mode_set);
        assert_eq!(loaded.config.mosaic.dither_mode, DitherMode::None);
    }

    #[test]
    fn menu_choices_map_to_modes() {
        assert_eq!(DitherMode::from_choice(0), DitherMode::None);
        assert_eq!(DitherMode::from_choice(1), DitherMode::Ordered);
        assert_eq!(DitherMode::parse_lenient("2"), DitherMode::ErrorDiffusion);
        assert_eq!(DitherMode::parse_lenient("-1"), DitherMode::None);
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mosaic.toml");
        std::fs::write(&path, "[runtime]\nworkers = 3\nkeep_audio = true\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.runtime.workers, 3);
        assert!(config.runtime.keep_audio);
        assert_eq!(config.runtime.effective_workers(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/tilemosaic.toml")).is_err());
    }
}
