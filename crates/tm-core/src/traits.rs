use crate::error::MosaicError;
use crate::frame::{FrameBuffer, LumaGrid, SourceFrame};

/// Frame rate as an exact rational, as reported by the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Frames per second as a float. A zero denominator yields 0.0.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        f64::from(self.num) / f64::from(self.den)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Stream metadata known before the first frame is read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Frame count when the container declares one.
    pub frame_count: Option<u64>,
}

/// Fournit des frames décodées au pipeline, dans l'ordre du flux.
///
/// Implémenté par : `VideoSource`, `MemorySource`.
///
/// # Example
/// ```
/// use tm_core::error::MosaicError;
/// use tm_core::frame::SourceFrame;
/// use tm_core::traits::{FrameSource, StreamInfo, FrameRate};
///
/// struct Empty;
/// impl FrameSource for Empty {
///     fn next_frame(&mut self) -> Result<Option<SourceFrame>, MosaicError> { Ok(None) }
///     fn info(&self) -> StreamInfo {
///         StreamInfo { width: 0, height: 0, frame_rate: FrameRate::default(), frame_count: Some(0) }
///     }
/// }
/// ```
pub trait FrameSource: Send {
    /// Prochaine frame, `Ok(None)` en fin de flux.
    ///
    /// # Errors
    /// [`MosaicError::FrameDecode`] for a truncated or undecodable frame.
    fn next_frame(&mut self) -> Result<Option<SourceFrame>, MosaicError>;

    /// Dimensions et cadence du flux.
    fn info(&self) -> StreamInfo;
}

/// Consomme les frames produites, dans l'ordre.
pub trait FrameSink {
    /// Append one frame to the output stream.
    ///
    /// # Errors
    /// [`MosaicError::Sink`] if the frame cannot be written.
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<(), MosaicError>;
}

/// Binarise une grille de luminance en place (valeurs 0 ou 255 en sortie).
///
/// # Example
/// ```
/// use tm_core::frame::LumaGrid;
/// use tm_core::traits::Dither;
///
/// struct Midpoint;
/// impl Dither for Midpoint {
///     fn dither(&self, grid: &mut LumaGrid) {
///         for v in &mut grid.cells { *v = if *v > 127 { 255 } else { 0 }; }
///     }
///     fn name(&self) -> &'static str { "midpoint" }
/// }
/// let mut grid = LumaGrid::from_cells(2, 1, vec![10, 200]).unwrap();
/// Midpoint.dither(&mut grid);
/// assert_eq!(grid.cells, vec![0, 255]);
/// ```
pub trait Dither: Send + Sync {
    /// Transform `grid` in place.
    fn dither(&self, grid: &mut LumaGrid);

    /// Nom lisible pour le debug/logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntsc_rate_displays_as_fraction() {
        let rate = FrameRate {
            num: 30000,
            den: 1001,
        };
        assert_eq!(rate.to_string(), "30000/1001");
        assert!((rate.as_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn zero_denominator_is_zero_fps() {
        assert_eq!(FrameRate { num: 25, den: 0 }.as_f64(), 0.0);
    }
}
