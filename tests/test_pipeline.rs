// tests/test_pipeline.rs: End-to-end tests through `CoinPipeline::process_frame`.
//
// Frames are synthetic RGB buffers: a flat gold disk (RGB 120,115,80, roughly
// hue 52 deg, saturation 33%, value 47%) on a black background. The disk has radius
// 80, so its area lands in the 20-centimo range.

use coin_vision::core_modules::pixel_buffer::PixelBuffer;
use coin_vision::pipeline::{AnnotationKind, Denomination};
use coin_vision::{CoinPipeline, PipelineConfig, VisionError};

const GOLD: [u8; 3] = [120, 115, 80];

fn coin_frame(size: u32, center: (i64, i64), radius: i64) -> PixelBuffer {
    let mut frame = PixelBuffer::new(size, size, 3).unwrap();
    for y in 0..size as i64 {
        for x in 0..size as i64 {
            if (x - center.0).pow(2) + (y - center.1).pow(2) <= radius * radius {
                frame.set_rgb(x, y, GOLD);
            }
        }
    }
    frame
}

fn pipeline() -> CoinPipeline {
    CoinPipeline::new(PipelineConfig::default()).unwrap()
}

#[test]
fn still_gold_coin_is_counted_once() {
    let mut pipeline = pipeline();
    let frame = coin_frame(200, (100, 100), 80);

    let mut last = None;
    for frame_index in 1..=35 {
        let report = pipeline.process_frame(&frame, frame_index).unwrap();
        assert_eq!(report.detections, 1);
        last = Some(report);
    }
    let report = last.unwrap();
    assert_eq!(report.counts.get_label("20 centimos"), Some(1));
    assert_eq!(report.total(), 1);
    assert_eq!(report.counts.non_zero().count(), 1);
    assert_eq!(report.annotations[0].kind, AnnotationKind::Confirmed);
    assert_eq!(report.annotations[0].label, "20 centimos");
    assert_eq!(report.annotations[0].color(), [0, 255, 0]);
    assert_eq!(pipeline.counts()[Denomination::TwentyCents], 1);
}

#[test]
fn first_sighting_is_annotated_as_new() {
    let mut pipeline = pipeline();
    let report = pipeline.process_frame(&coin_frame(200, (100, 100), 80), 1).unwrap();
    assert_eq!(report.annotations.len(), 1);
    let annotation = &report.annotations[0];
    assert_eq!(annotation.kind, AnnotationKind::New);
    assert_eq!(annotation.center, (100, 100));
    assert!(annotation.detail.starts_with("(A:"));
}

#[test]
fn empty_frame_is_a_normal_result() {
    let mut pipeline = pipeline();
    let report = pipeline.process_frame(&PixelBuffer::new(200, 200, 3).unwrap(), 1).unwrap();
    assert_eq!(report.blobs_found, 0);
    assert_eq!(report.detections, 0);
    assert!(report.annotations.is_empty());
    assert_eq!(report.total(), 0);
}

#[test]
fn bad_frames_leave_tracker_untouched() {
    let mut pipeline = pipeline();
    pipeline.process_frame(&coin_frame(200, (100, 100), 80), 1).unwrap();
    let tracks_before = pipeline.tracks().len();

    let wrong_size = coin_frame(100, (50, 50), 40);
    assert!(matches!(
        pipeline.process_frame(&wrong_size, 2),
        Err(VisionError::DimensionMismatch { expected_width: 200, found_width: 100, .. })
    ));

    let gray = PixelBuffer::new(200, 200, 1).unwrap();
    assert_eq!(
        pipeline.process_frame(&gray, 2).unwrap_err(),
        VisionError::ChannelMismatch { expected: 3, found: 1 }
    );

    assert_eq!(pipeline.tracks().len(), tracks_before);
    assert_eq!(pipeline.tracks()[0].last_seen, 1);
    assert_eq!(pipeline.last_frame(), Some(1));

    // Frame 2 was never consumed, so it is still accepted.
    assert!(pipeline.process_frame(&coin_frame(200, (100, 100), 80), 2).is_ok());
    assert_eq!(pipeline.tracks()[0].history().len(), 2);
}

#[test]
fn frames_must_strictly_increase() {
    let mut pipeline = pipeline();
    let frame = coin_frame(200, (100, 100), 80);
    pipeline.process_frame(&frame, 10).unwrap();
    assert_eq!(
        pipeline.process_frame(&frame, 9).unwrap_err(),
        VisionError::FrameOutOfOrder { last: 10, got: 9 }
    );
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = PipelineConfig::from_toml_str("[segmentation]\nkernel_size = 0");
    assert!(config.is_err());

    let mut config = PipelineConfig::default();
    config.tracker.stability_window = 0;
    assert!(CoinPipeline::new(config).is_err());
}
