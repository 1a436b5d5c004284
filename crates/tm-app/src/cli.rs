use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tm_core::config::{AppConfig, DitherMode, LoadedConfig, Sampling, TileFit, load_config_file};

/// tilemosaic : convertit une vidéo en mosaïque pixel-art à deux tuiles.
#[derive(Parser, Debug)]
#[command(name = "tilemosaic", version, about, long_about = None)]
pub struct Cli {
    /// Vidéo d'entrée.
    pub input: PathBuf,

    /// Côté d'un bloc en pixels (entier positif).
    pub block_size: u32,

    /// Seuil de binarisation (0-255) : en dessous, tuile noire.
    pub threshold: u8,

    /// Image de la tuile « noire » (block_size × block_size).
    pub black_tile: PathBuf,

    /// Image de la tuile « blanche » (block_size × block_size).
    pub white_tile: PathBuf,

    /// Vidéo de sortie.
    pub output: PathBuf,

    /// Tramage : 0/none, 1/ordered, 2/error-diffusion. Demandé interactivement si absent.
    #[arg(long)]
    pub dither: Option<String>,

    /// Échantillonnage de la grille.
    #[arg(long, value_enum)]
    pub sampling: Option<SamplingArg>,

    /// Redimensionner les tuiles à la taille du bloc au lieu de les refuser.
    #[arg(long, default_value_t = false)]
    pub resize_tiles: bool,

    /// Threads de traitement (0 = tous les cœurs).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Recopier la piste audio de l'entrée dans la sortie.
    #[arg(long, default_value_t = false)]
    pub keep_audio: bool,

    /// Fichier de configuration TOML (encodeur, runtime, valeurs par défaut).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// `--sampling` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SamplingArg {
    Area,
    BlockMean,
}

impl From<SamplingArg> for Sampling {
    fn from(arg: SamplingArg) -> Self {
        match arg {
            SamplingArg::Area => Self::Area,
            SamplingArg::BlockMean => Self::BlockMean,
        }
    }
}

/// Config after merging the file and the command line.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub config: AppConfig,
    /// True when `--dither` or the config file's `dither_mode` chose the mode.
    pub dither_chosen: bool,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides on top.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed.
    pub fn resolve_config(&self) -> Result<ResolvedConfig> {
        let LoadedConfig {
            mut config,
            dither_mode_set,
        } = match &self.config {
            Some(path) => load_config_file(path)?,
            None => LoadedConfig {
                config: AppConfig::default(),
                dither_mode_set: false,
            },
        };

        config.mosaic.block_size = self.block_size;
        config.mosaic.threshold = self.threshold;
        if let Some(mode) = &self.dither {
            config.mosaic.dither_mode = DitherMode::parse_lenient(mode);
        }
        if let Some(sampling) = self.sampling {
            config.mosaic.sampling = sampling.into();
        }
        if self.resize_tiles {
            config.mosaic.tile_fit = TileFit::Resize;
        }
        if let Some(workers) = self.workers {
            config.runtime.workers = workers;
        }
        if self.keep_audio {
            config.runtime.keep_audio = true;
        }
        config.clamp_all();
        Ok(ResolvedConfig {
            config,
            dither_chosen: dither_mode_set || self.dither.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const POSITIONALS: [&str; 7] = [
        "tilemosaic",
        "in.mp4",
        "10",
        "128",
        "black.png",
        "white.png",
        "out.mp4",
    ];

    fn parse(extra: &[&str]) -> Cli {
        Cli::try_parse_from(POSITIONALS.iter().chain(extra)).unwrap()
    }

    #[test]
    fn positionals_are_required() {
        assert!(Cli::try_parse_from(["tilemosaic", "in.mp4", "10"]).is_err());
        let cli = parse(&[]);
        assert_eq!(cli.block_size, 10);
        assert_eq!(cli.threshold, 128);
        assert_eq!(cli.output, PathBuf::from("out.mp4"));
        assert!(!cli.resolve_config().unwrap().dither_chosen);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut args = POSITIONALS;
        args[3] = "300";
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--dither",
            "2",
            "--sampling",
            "block-mean",
            "--resize-tiles",
            "--workers",
            "3",
            "--keep-audio",
        ]);
        let resolved = cli.resolve_config().unwrap();
        assert!(resolved.dither_chosen);
        let config = resolved.config;
        assert_eq!(config.mosaic.dither_mode, DitherMode::ErrorDiffusion);
        assert_eq!(config.mosaic.sampling, Sampling::BlockMean);
        assert_eq!(config.mosaic.tile_fit, TileFit::Resize);
        assert_eq!(config.runtime.workers, 3);
        assert!(config.runtime.keep_audio);
    }

    #[test]
    fn unknown_dither_falls_back_to_none() {
        let config = parse(&["--dither", "sierra"]).resolve_config().unwrap().config;
        assert_eq!(config.mosaic.dither_mode, DitherMode::None);
    }

    #[test]
    fn config_file_is_merged_under_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[mosaic]\nblock_size = 4\ndither_mode = \"Ordered\"\n[encoder]\ncrf = 99\n[runtime]\nworkers = 2"
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let cli = parse(&["--config", &path, "--workers", "5"]);
        let resolved = cli.resolve_config().unwrap();
        assert!(resolved.dither_chosen);
        let config = resolved.config;
        // Les positionnels gagnent toujours
        assert_eq!(config.mosaic.block_size, 10);
        assert_eq!(config.mosaic.dither_mode, DitherMode::Ordered);
        assert_eq!(config.encoder.crf, 51);
        assert_eq!(config.runtime.workers, 5);
    }

    #[test]
    fn config_without_dither_mode_still_prompts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[encoder]\npreset = \"slow\"").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let resolved = parse(&["--config", &path]).resolve_config().unwrap();
        assert!(!resolved.dither_chosen);
        assert_eq!(resolved.config.encoder.preset, "slow");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/tilemosaic.toml"]);
        assert!(cli.resolve_config().is_err());
    }
}
