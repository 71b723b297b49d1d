// THEORY:
// The `pipeline` module is the top-level API of the coin counter. It owns the
// configuration and the tracker, runs every stage in order for one frame, and hands
// back a `FrameReport` the caller can render or log.
//
// Key architectural principles:
// 1.  **Stage Order**: RGB frame -> HSV -> band masks (OR-ed) -> opening -> closing ->
//     labeling -> shape filter -> center color -> tracker. Stages before the tracker
//     are pure functions of the frame; only the tracker carries state.
// 2.  **All-or-Nothing Frames**: every fallible stage runs before the tracker is
//     touched. A frame that fails anywhere is reported as an error and leaves the
//     tracker, the counts and the frame cursor exactly as they were.
// 3.  **Ordered Input**: frame indices must strictly increase, and every frame must
//     have the dimensions of the first frame that was accepted.

use crate::config::PipelineConfig;
use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::classifier::{passes_filter, sample_color};
use crate::core_modules::color_segmenter::{segment_bands, to_hsv};
use crate::core_modules::morphology::{close, open};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::tracker::CoinTracker;
use crate::error::{ConfigError, VisionError};
use tracing::{debug, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::annotation::{Annotation, AnnotationKind};
pub use crate::core_modules::classifier::{CoinColor, Denomination};
pub use crate::core_modules::tracker::{CountTable, Detection, Track, TrackState};

/// Everything the caller needs to know about one processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_index: u64,
    /// Connected regions found in the cleaned mask, before filtering.
    pub blobs_found: usize,
    /// Blobs that passed the area and circularity filter.
    pub detections: usize,
    /// One directive per detection, in labeler order.
    pub annotations: Vec<Annotation>,
    /// Running tally after this frame.
    pub counts: CountTable,
}

impl FrameReport {
    pub fn total(&self) -> u32 {
        self.counts.total()
    }
}

/// The main, top-level struct of the coin counter.
#[derive(Debug, Clone)]
pub struct CoinPipeline {
    config: PipelineConfig,
    tracker: CoinTracker,
    last_frame: Option<u64>,
    frame_size: Option<(u32, u32)>,
}

impl CoinPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tracker: CoinTracker::new(config.tracker.clone()),
            config,
            last_frame: None,
            frame_size: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracks(&self) -> &[Track] {
        self.tracker.tracks()
    }

    pub fn counts(&self) -> &CountTable {
        self.tracker.counts()
    }

    /// Index of the last frame that was processed successfully.
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Runs the whole pipeline on one RGB frame.
    pub fn process_frame(
        &mut self,
        frame: &PixelBuffer,
        frame_index: u64,
    ) -> Result<FrameReport, VisionError> {
        let stages = self
            .check_order(frame_index)
            .and_then(|_| self.detect(frame));
        let (blobs_found, detections) = match stages {
            Ok(found) => found,
            Err(err) => {
                warn!(frame = frame_index, error = %err, "frame skipped");
                return Err(err);
            }
        };

        self.frame_size.get_or_insert((frame.width(), frame.height()));
        self.last_frame = Some(frame_index);
        let annotations = self.tracker.update(&detections, frame_index);

        debug!(
            frame = frame_index,
            blobs = blobs_found,
            detections = detections.len(),
            tracks = self.tracker.tracks().len(),
            "frame processed"
        );

        Ok(FrameReport {
            frame_index,
            blobs_found,
            detections: detections.len(),
            annotations,
            counts: self.tracker.counts().clone(),
        })
    }

    /// Runs every stateless stage and returns the blob count plus the filtered detections.
    /// Does not touch the tracker.
    pub fn detect(&self, frame: &PixelBuffer) -> Result<(usize, Vec<Detection>), VisionError> {
        frame.ensure_channels(3)?;
        if let Some((width, height)) = self.frame_size {
            if (width, height) != (frame.width(), frame.height()) {
                return Err(VisionError::DimensionMismatch {
                    expected_width: width,
                    expected_height: height,
                    found_width: frame.width(),
                    found_height: frame.height(),
                });
            }
        }

        let segmentation = &self.config.segmentation;
        let hsv = to_hsv(frame)?;
        let mask = segment_bands(&hsv, &segmentation.bands)?;

        let mut opened = PixelBuffer::new(frame.width(), frame.height(), 1)?;
        open(&mask, &mut opened, segmentation.kernel_size)?;
        let mut cleaned = PixelBuffer::new(frame.width(), frame.height(), 1)?;
        close(&opened, &mut cleaned, segmentation.kernel_size)?;

        let labeling = blob_detector::find_blobs(&cleaned)?;
        let blobs_found = labeling.count();
        let detections = labeling
            .blobs
            .into_iter()
            .filter(|blob| passes_filter(blob, &self.config.filter))
            .map(|blob| {
                let color = sample_color(frame, blob.center(), &self.config.colors);
                Detection { blob, color }
            })
            .collect();
        Ok((blobs_found, detections))
    }

    fn check_order(&self, frame_index: u64) -> Result<(), VisionError> {
        match self.last_frame {
            Some(last) if frame_index <= last => Err(VisionError::FrameOutOfOrder {
                last,
                got: frame_index,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_frame(size: u32, side: u32, rgb: [u8; 3]) -> PixelBuffer {
        let mut frame = PixelBuffer::new(size, size, 3).unwrap();
        let start = ((size - side) / 2) as i64;
        for y in start..start + side as i64 {
            for x in start..start + side as i64 {
                frame.set_rgb(x, y, rgb);
            }
        }
        frame
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.segmentation.kernel_size = 2;
        assert!(CoinPipeline::new(config).is_err());
    }

    #[test]
    fn keeps_the_config_it_was_built_with() {
        let mut config = PipelineConfig::default();
        config.filter.min_area = 500;
        let pipeline = CoinPipeline::new(config.clone()).unwrap();
        assert_eq!(pipeline.config(), &config);
        assert_eq!(pipeline.last_frame(), None);
    }

    #[test]
    fn detect_finds_gold_square() {
        let pipeline = CoinPipeline::new(PipelineConfig::default()).unwrap();
        let frame = square_frame(120, 90, [120, 115, 80]);
        let (blobs, detections) = pipeline.detect(&frame).unwrap();
        assert_eq!(blobs, 1);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].blob.area, 8100);
        assert_eq!(detections[0].color, CoinColor::Gold);
    }

    #[test]
    fn small_blobs_are_filtered_out() {
        let mut pipeline = CoinPipeline::new(PipelineConfig::default()).unwrap();
        let report = pipeline.process_frame(&square_frame(60, 20, [120, 115, 80]), 1).unwrap();
        assert_eq!(report.blobs_found, 1);
        assert_eq!(report.detections, 0);
        assert!(report.annotations.is_empty());
        assert!(pipeline.tracks().is_empty());
    }

    #[test]
    fn out_of_order_frame_is_rejected_without_side_effects() {
        let mut pipeline = CoinPipeline::new(PipelineConfig::default()).unwrap();
        let frame = square_frame(120, 90, [120, 115, 80]);
        pipeline.process_frame(&frame, 5).unwrap();
        assert_eq!(
            pipeline.process_frame(&frame, 5).unwrap_err(),
            VisionError::FrameOutOfOrder { last: 5, got: 5 }
        );
        assert_eq!(pipeline.last_frame(), Some(5));
        assert_eq!(pipeline.tracks()[0].last_seen, 5);
    }
}
