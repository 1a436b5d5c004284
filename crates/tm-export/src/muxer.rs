use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tm_core::config::EncoderConfig;
use tm_core::error::MosaicError;
use tm_core::frame::FrameBuffer;
use tm_core::traits::{FrameRate, FrameSink};

/// Encode des frames RGB24 brutes via ffmpeg (stdin → fichier de sortie).
///
/// The output keeps the input size and its exact rational frame rate.
pub struct Mp4Muxer {
    child: Option<Child>,
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

/// Arguments ffmpeg de l'encodeur, sans le nom du binaire.
fn encoder_args(
    output_path: &Path,
    width: u32,
    height: u32,
    frame_rate: FrameRate,
    encoder: &EncoderConfig,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-f",
        "rawvideo",
        "-vcodec",
        "rawvideo",
        "-s",
        &format!("{width}x{height}"),
        "-pix_fmt",
        "rgb24",
        "-r",
        &frame_rate.to_string(),
        "-i",
        "-",
        "-an",
        "-c:v",
        &encoder.codec,
        "-crf",
        &encoder.crf.to_string(),
        "-preset",
        &encoder.preset,
        "-pix_fmt",
        &encoder.pix_fmt,
        "-hide_banner",
        "-loglevel",
        "error",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(output_path.as_os_str().to_owned());
    args
}

impl Mp4Muxer {
    /// Lance l'encodeur ffmpeg pour un flux `width × height` à `frame_rate`.
    ///
    /// # Errors
    /// [`MosaicError::SinkOpen`] si ffmpeg est introuvable ou ne démarre pas,
    /// [`MosaicError::InvalidDimensions`] pour une taille nulle.
    pub fn new(
        output_path: &Path,
        width: u32,
        height: u32,
        frame_rate: FrameRate,
        encoder: &EncoderConfig,
    ) -> Result<Self, MosaicError> {
        if width == 0 || height == 0 {
            return Err(MosaicError::InvalidDimensions { width, height });
        }
        if encoder.is_chroma_subsampled() && (width % 2 != 0 || height % 2 != 0) {
            log::warn!(
                "Dimensions impaires {width}x{height} avec {} : l'encodeur risque de refuser le flux",
                encoder.pix_fmt
            );
        }

        let child = Command::new("ffmpeg")
            .args(encoder_args(output_path, width, height, frame_rate, encoder))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MosaicError::SinkOpen {
                path: output_path.to_path_buf(),
                reason: format!("impossible de lancer ffmpeg ({e}). Est-il dans le PATH ?"),
            })?;
        log::debug!(
            "ffmpeg (encodeur) spawné : {} {width}x{height} @ {frame_rate}, crf {}, preset {}",
            encoder.codec,
            encoder.crf,
            encoder.preset
        );

        Ok(Self {
            child: Some(child),
            path: output_path.to_path_buf(),
            width,
            height,
            frames_written: 0,
        })
    }

    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Ferme le flux et attend la fin de l'encodage.
    ///
    /// Returns the number of frames sent to the encoder.
    ///
    /// # Errors
    /// [`MosaicError::SinkOpen`] si ffmpeg n'a pas pu produire le fichier de sortie,
    /// [`MosaicError::Sink`] si l'attente du processus échoue.
    pub fn finish(mut self) -> Result<u64, MosaicError> {
        let Some(mut child) = self.child.take() else {
            return Ok(self.frames_written);
        };
        drop(child.stdin.take());

        let output = child
            .wait_with_output()
            .map_err(|e| MosaicError::Sink(format!("attente de ffmpeg : {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MosaicError::SinkOpen {
                path: self.path.clone(),
                reason: format!("ffmpeg a échoué ({}) : {}", output.status, stderr.trim()),
            });
        }
        log::info!(
            "Encodage terminé : {} frames → {}",
            self.frames_written,
            self.path.display()
        );
        Ok(self.frames_written)
    }
}

impl FrameSink for Mp4Muxer {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<(), MosaicError> {
        if frame.width != self.width || frame.height != self.height || !frame.is_consistent() {
            return Err(MosaicError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
            });
        }
        let stdin = self
            .child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .ok_or_else(|| MosaicError::Sink("flux de l'encodeur déjà fermé".into()))?;
        stdin.write_all(&frame.data).map_err(|e| {
            MosaicError::Sink(format!(
                "écriture frame {} vers ffmpeg : {e}",
                self.frames_written
            ))
        })?;
        self.frames_written += 1;
        Ok(())
    }
}

impl Drop for Mp4Muxer {
    fn drop(&mut self) {
        // Run interrompu : on ne laisse pas d'encodeur orphelin
        if let Some(mut c) = self.child.take() {
            let _ = c.kill();
            let _ = c.wait();
        }
    }
}

/// Arguments ffmpeg du muxage audio, sans le nom du binaire.
///
/// The video stream is the reference: the output stops at `video_duration` when given,
/// audio that ends early simply leaves the tail silent.
fn mux_args(
    video_path: &Path,
    audio_source: &Path,
    final_path: &Path,
    video_duration: Option<Duration>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), video_path.into()];
    args.extend(["-i".into(), audio_source.into()]);
    args.extend(
        [
            "-map", "0:v:0", "-map", "1:a:0?", "-c:v", "copy", "-c:a", "aac", "-b:a", "192k",
        ]
        .iter()
        .map(OsString::from),
    );
    if let Some(duration) = video_duration {
        args.push("-t".into());
        args.push(format!("{:.6}", duration.as_secs_f64()).into());
    }
    args.extend(
        ["-hide_banner", "-loglevel", "error"]
            .iter()
            .map(OsString::from),
    );
    args.push(final_path.into());
    args
}

/// Fusionne la vidéo encodée avec la piste audio de la source.
///
/// Video is stream-copied, audio is re-encoded to AAC. An input without audio
/// still produces a valid (silent) output. Every encoded frame is kept.
///
/// # Errors
/// Retourne une erreur si le muxage ffmpeg échoue.
pub fn mux_audio_video(
    video_path: &Path,
    audio_source: &Path,
    final_path: &Path,
    video_duration: Option<Duration>,
) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(mux_args(video_path, audio_source, final_path, video_duration))
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .context("impossible de lancer ffmpeg pour le muxage audio")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Mux audio/vidéo : {}", stderr.trim());
    }
    log::info!(
        "Audio de {} ajouté → {}",
        audio_source.display(),
        final_path.display()
    );
    Ok(())
}
