// Décodage vidéo via ffmpeg en subprocess (std::process::Command), sans binding C.
// Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH.
//
// Architecture :
//   - `probe_video`       : interroge ffprobe pour obtenir width/height/fps/nb_frames
//   - `spawn_ffmpeg_pipe` : lance ffmpeg → flux raw RGB24 sur stdout, résolution native
//   - `VideoSource`       : lit une frame complète par appel, dans l'ordre du flux

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tm_core::error::MosaicError;
use tm_core::frame::{FrameBuffer, SourceFrame};
use tm_core::traits::{FrameRate, FrameSource, StreamInfo};

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// [`MosaicError::SourceOpen`] si le fichier est absent, si `ffprobe` est introuvable
/// ou si le fichier ne contient aucun flux vidéo décodable.
pub fn probe_video(path: &Path) -> Result<StreamInfo, MosaicError> {
    let open_err = |reason: String| MosaicError::SourceOpen {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(open_err("fichier introuvable".into()));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            open_err(format!(
                "impossible de lancer ffprobe ({e}). Vérifiez qu'il est installé et dans le PATH."
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(open_err(format!("ffprobe a échoué : {}", stderr.trim())));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&text)
        .ok_or_else(|| open_err("aucun flux vidéo trouvé".into()))?;

    log::info!(
        "probe_video: {}x{} @ {} ({:.3}fps), {} frames ({})",
        info.width,
        info.height,
        info.frame_rate,
        info.frame_rate.as_f64(),
        info.frame_count
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
        path.display()
    );

    Ok(info)
}

/// Parse `key=value` lines printed by ffprobe.
///
/// Returns `None` unless both dimensions are present and non-zero.
fn parse_probe_output(text: &str) -> Option<StreamInfo> {
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut frame_rate = FrameRate::default();
    let mut frame_count: Option<u64> = None;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num = parts.next().and_then(|s| s.parse::<u32>().ok());
            let den = parts.next().map_or(Some(1), |s| s.parse::<u32>().ok());
            if let (Some(num), Some(den)) = (num, den)
                && num > 0
                && den > 0
            {
                frame_rate = FrameRate { num, den };
            }
        } else if let Some(val) = line.strip_prefix("nb_frames=") {
            // "N/A" pour les conteneurs sans index (mkv, webm)
            frame_count = val.trim().parse().ok();
        }
    }

    match (width, height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Some(StreamInfo {
            width,
            height,
            frame_rate,
            frame_count,
        }),
        _ => None,
    }
}

/// Lance un processus `ffmpeg` qui écrit des frames RGB24 brutes sur stdout.
///
/// Chaque frame = `w × h × 3` bytes (RGB row-major, sans padding).
/// `-vsync 0` garde une frame de sortie par frame décodée (pas de duplication/drop).
/// `-an` supprime l'audio.
///
/// # Errors
/// Retourne une erreur si le spawn échoue.
pub fn spawn_ffmpeg_pipe(path: &Path) -> Result<Child> {
    let child = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .args([
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-vsync",
            "0",
            "-an",
            "-sn",
            "-hide_banner",
            "-loglevel",
            "error",
            "pipe:1",
        ])
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("impossible de lancer ffmpeg. Vérifiez qu'il est installé et dans le PATH.")?;
    log::debug!("ffmpeg (décodeur) spawné pour {}", path.display());
    Ok(child)
}

/// Lit jusqu'à `buf.len()` bytes depuis `reader`, en s'arrêtant à EOF.
///
/// Retourne le nombre de bytes lus : `buf.len()` pour une frame complète,
/// 0 pour une fin de flux propre, entre les deux pour une frame tronquée.
///
/// # Errors
/// Retourne `Err` sur erreur I/O fatale.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break, // EOF
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Source vidéo séquentielle : une frame RGB24 par appel, résolution native.
pub struct VideoSource {
    path: PathBuf,
    info: StreamInfo,
    child: Option<Child>,
    next_index: u64,
}

impl VideoSource {
    /// Probe `path` and start decoding it.
    ///
    /// # Errors
    /// [`MosaicError::SourceOpen`] if the file cannot be probed or ffmpeg cannot start.
    pub fn open(path: &Path) -> Result<Self, MosaicError> {
        let info = probe_video(path)?;
        let child = spawn_ffmpeg_pipe(path).map_err(|e| MosaicError::SourceOpen {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            info,
            child: Some(child),
            next_index: 0,
        })
    }

    /// Reap the decoder after a clean EOF and surface its exit status.
    fn finish_decoder(&mut self, index: u64) -> Result<(), MosaicError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| MosaicError::FrameDecode {
            index,
            reason: format!("attente de ffmpeg : {e}"),
        })?;
        if !status.success() {
            return Err(MosaicError::FrameDecode {
                index,
                reason: format!("ffmpeg a échoué sur {} ({status})", self.path.display()),
            });
        }
        log::info!(
            "Décodage terminé : {} frames lues depuis {}",
            self.next_index,
            self.path.display()
        );
        Ok(())
    }

    fn kill_decoder(&mut self) {
        if let Some(mut c) = self.child.take() {
            let _ = c.kill();
            let _ = c.wait();
        }
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<SourceFrame>, MosaicError> {
        let index = self.next_index;
        let Some(stdout) = self.child.as_mut().and_then(|c| c.stdout.as_mut()) else {
            return Ok(None);
        };

        let mut frame = FrameBuffer::new(self.info.width, self.info.height);
        let read = match read_exact_or_eof(stdout, &mut frame.data) {
            Ok(n) => n,
            Err(e) => {
                self.kill_decoder();
                return Err(MosaicError::FrameDecode {
                    index,
                    reason: format!("erreur lecture pipe : {e}"),
                });
            }
        };

        if read == 0 {
            self.finish_decoder(index)?;
            return Ok(None);
        }
        if read < frame.data.len() {
            self.kill_decoder();
            return Err(MosaicError::FrameDecode {
                index,
                reason: format!("frame tronquée ({read}/{} octets)", frame.data.len()),
            });
        }

        self.next_index += 1;
        let fps = self.info.frame_rate.as_f64();
        let pts_secs = if fps > 0.0 { index as f64 / fps } else { 0.0 };
        Ok(Some(SourceFrame {
            index,
            pts_secs,
            frame,
        }))
    }

    fn info(&self) -> StreamInfo {
        self.info
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        self.kill_decoder();
    }
}
