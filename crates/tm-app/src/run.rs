use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempPath;
use tm_core::config::AppConfig;
use tm_core::traits::FrameSource;
use tm_export::{Mp4Muxer, mux_audio_video};
use tm_mosaic::{FramePipeline, run_frames};
use tm_source::{VideoSource, load_tiles};

/// Statistiques de fin de run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    /// Frames written to the output.
    pub frames: u64,
    /// Wall-clock time from the first decoded frame to the finalized output.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Average seconds spent per frame, 0 for an empty run.
    #[must_use]
    pub fn avg_frame_secs(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() / self.frames as f64
    }

    /// Average throughput in frames per second, 0 for an empty run.
    #[must_use]
    pub fn avg_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if self.frames == 0 || secs <= 0.0 {
            return 0.0;
        }
        self.frames as f64 / secs
    }

    /// The two summary lines printed after a successful run.
    #[must_use]
    pub fn report(&self) -> [String; 2] {
        [
            format!(
                "Processing completed in {:.3} seconds.",
                self.elapsed.as_secs_f64()
            ),
            format!(
                "Average time per frame: {:.4} seconds ({:.2} fps)",
                self.avg_frame_secs(),
                self.avg_fps()
            ),
        ]
    }
}

fn progress_bar(total: Option<u64>) -> Result<ProgressBar> {
    let Some(total) = total else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} frames")?,
        );
        return Ok(pb);
    };
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Move the encoded temp video to `output`, adding the input's audio when asked.
///
/// The temp file is removed in every case.
fn finalize_output(
    temp_video: TempPath,
    input: &Path,
    output: &Path,
    keep_audio: bool,
    video_duration: Option<Duration>,
) -> Result<()> {
    if keep_audio {
        return mux_audio_video(&temp_video, input, output, video_duration);
    }
    temp_video
        .persist(output)
        .with_context(|| format!("Impossible d'écrire {}", output.display()))?;
    Ok(())
}

/// Fichier vidéo temporaire à côté de la sortie, même extension, supprimé automatiquement.
fn temp_video_path(output: &Path) -> Result<TempPath> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file = tempfile::Builder::new()
        .prefix(".tilemosaic-")
        .suffix(&format!(
            ".{}",
            output
                .extension()
                .map_or_else(|| "mp4".into(), |e| e.to_string_lossy())
        ))
        .tempfile_in(&dir)
        .with_context(|| {
            format!(
                "Impossible de créer un fichier temporaire dans {}",
                dir.display()
            )
        })?;
    Ok(file.into_temp_path())
}

/// Run the whole conversion: decode, transform on the worker pool, encode, optionally add audio.
///
/// # Errors
/// Any failure of the run. Typed failures are kept as [`tm_core::MosaicError`]
/// under added context.
pub fn run(
    input: &Path,
    black_tile: &Path,
    white_tile: &Path,
    output: &Path,
    config: &AppConfig,
) -> Result<RunSummary> {
    config.mosaic.validate()?;
    let tiles = load_tiles(
        black_tile,
        white_tile,
        config.mosaic.block_size,
        config.mosaic.tile_fit,
    )?;
    let pipeline = FramePipeline::new(config.mosaic.clone(), Arc::new(tiles))?;

    let mut source = VideoSource::open(input)?;
    let info = source.info();
    log::info!(
        "{} : {}x{} @ {}, tramage {}",
        input.display(),
        info.width,
        info.height,
        info.frame_rate,
        config.mosaic.dither_mode.label()
    );

    // Rien n'apparaît à `output` tant que le run n'a pas réussi
    let temp_video = temp_video_path(output)?;

    let start = Instant::now();
    let mut muxer = Mp4Muxer::new(
        &temp_video,
        info.width,
        info.height,
        info.frame_rate,
        &config.encoder,
    )?;

    let pb = progress_bar(info.frame_count)?;
    let frames = run_frames(
        &mut source,
        &pipeline,
        &mut muxer,
        config.runtime.effective_workers(),
        |n| pb.set_position(n),
    )
    .with_context(|| format!("Échec du traitement de {}", input.display()))?;
    muxer.finish()?;
    pb.finish_and_clear();

    let fps = info.frame_rate.as_f64();
    let duration = (fps > 0.0).then(|| Duration::from_secs_f64(frames as f64 / fps));
    finalize_output(temp_video, input, output, config.runtime.keep_audio, duration)?;

    Ok(RunSummary {
        frames,
        elapsed: start.elapsed(),
    })
}
