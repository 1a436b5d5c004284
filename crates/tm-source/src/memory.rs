use std::collections::VecDeque;

use tm_core::error::MosaicError;
use tm_core::frame::{FrameBuffer, SourceFrame};
use tm_core::traits::{FrameRate, FrameSource, StreamInfo};

/// Source de frames en mémoire. Utile pour les tests et l'usage en bibliothèque.
///
/// # Example
/// ```
/// use tm_core::frame::FrameBuffer;
/// use tm_core::traits::{FrameRate, FrameSource};
/// use tm_source::MemorySource;
///
/// let mut source = MemorySource::new(vec![FrameBuffer::new(4, 4)], FrameRate::default());
/// assert_eq!(source.info().frame_count, Some(1));
/// assert!(source.next_frame().unwrap().is_some());
/// assert!(source.next_frame().unwrap().is_none());
/// ```
pub struct MemorySource {
    frames: VecDeque<FrameBuffer>,
    info: StreamInfo,
    next_index: u64,
}

impl MemorySource {
    /// Dimensions are taken from the first frame (0×0 when empty).
    #[must_use]
    pub fn new(frames: Vec<FrameBuffer>, frame_rate: FrameRate) -> Self {
        let (width, height) = frames.first().map_or((0, 0), |f| (f.width, f.height));
        let info = StreamInfo {
            width,
            height,
            frame_rate,
            frame_count: Some(frames.len() as u64),
        };
        Self {
            frames: frames.into(),
            info,
            next_index: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<SourceFrame>, MosaicError> {
        let Some(frame) = self.frames.pop_front() else {
            return Ok(None);
        };
        let index = self.next_index;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_come_out_in_order_with_timestamps() {
        let frames = (0..3u8)
            .map(|i| FrameBuffer::filled(2, 2, (i, i, i)))
            .collect();
        let mut source = MemorySource::new(frames, FrameRate { num: 2, den: 1 });
        for expected in 0..3u64 {
            let f = source.next_frame().unwrap().unwrap();
            assert_eq!(f.index, expected);
            assert_eq!(f.frame.pixel(0, 0).0, expected as u8);
            assert!((f.pts_secs - expected as f64 * 0.5).abs() < 1e-9);
        }
        assert!(source.next_frame().unwrap().is_none());
    }
}
