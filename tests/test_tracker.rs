// tests/test_tracker.rs: Integration tests for the coin tracker lifecycle.
//
// Detections are synthesized directly, so these tests exercise association,
// confirmation, counting and eviction without any image processing.

use coin_vision::config::TrackerConfig;
use coin_vision::core_modules::blob::{BlobDescriptor, BoundingBox};
use coin_vision::core_modules::tracker::CoinTracker;
use coin_vision::pipeline::{AnnotationKind, CoinColor, Denomination, Detection, TrackState};

fn coin(x: u32, y: u32, area: u32, color: CoinColor) -> Detection {
    Detection {
        blob: BlobDescriptor {
            label: 1,
            bounding_box: BoundingBox::new(x, y, 160, 160),
            area,
            perimeter: 450,
            centroid: (x as f64 + 80.0, y as f64 + 80.0),
        },
        color,
    }
}

#[test]
fn stable_coin_confirms_exactly_once_with_mean_area() {
    let config = TrackerConfig::default();
    let mut tracker = CoinTracker::new(config.clone());
    let areas = [20000, 20100, 19900, 20200, 19800];
    let mut confirmations = 0;
    for (i, &area) in areas.iter().enumerate() {
        tracker.update(&[coin(100, 100, area, CoinColor::Gold)], i as u64 + 1);
        if tracker.tracks()[0].type_confirmed {
            confirmations += 1;
        }
    }
    assert_eq!(confirmations, 1);
    let track = &tracker.tracks()[0];
    assert_eq!(track.final_area, 20000.0);
    assert_eq!(track.denomination, Denomination::TwentyCents);

    // Later samples never change a confirmed track.
    tracker.update(&[coin(100, 100, 30000, CoinColor::Silver)], 6);
    let track = &tracker.tracks()[0];
    assert_eq!(track.final_area, 20000.0);
    assert_eq!(track.denomination, Denomination::TwentyCents);
    assert_eq!(track.history().len(), config.stability_window);
}

#[test]
fn coin_is_counted_at_dwell_threshold_and_never_again() {
    let mut tracker = CoinTracker::new(TrackerConfig::default());
    for frame in 1..=30 {
        tracker.update(&[coin(100, 100, 20000, CoinColor::Gold)], frame);
    }
    assert_eq!(tracker.counts().total(), 0);
    assert_eq!(tracker.tracks()[0].state(), TrackState::Confirmed);

    tracker.update(&[coin(100, 100, 20000, CoinColor::Gold)], 31);
    assert_eq!(tracker.counts().total(), 1);
    for frame in 32..=60 {
        tracker.update(&[coin(100, 100, 20000, CoinColor::Gold)], frame);
    }
    assert_eq!(tracker.counts().get_label("20 centimos"), Some(1));
    assert_eq!(tracker.counts().total(), 1);
}

#[test]
fn empty_frames_still_age_out_tracks() {
    let mut tracker = CoinTracker::new(TrackerConfig::default());
    for frame in 1..=31 {
        tracker.update(&[coin(100, 100, 20000, CoinColor::Gold)], frame);
    }
    assert_eq!(tracker.tracks()[0].state(), TrackState::Counted);

    // last_seen = 31; 101 - 31 = 70 is still within the forget threshold.
    let annotations = tracker.update(&[], 101);
    assert!(annotations.is_empty());
    assert_eq!(tracker.tracks().len(), 1);
    tracker.update(&[], 102);
    assert!(tracker.tracks().is_empty());
    assert_eq!(tracker.counts().total(), 1);

    // The same coin coming back is a new track.
    let annotations = tracker.update(&[coin(100, 100, 20000, CoinColor::Gold)], 103);
    assert_eq!(annotations[0].kind, AnnotationKind::New);
}

#[test]
fn moving_coin_keeps_its_track() {
    let mut tracker = CoinTracker::new(TrackerConfig::default());
    for frame in 0..20u32 {
        tracker.update(&[coin(100 + frame * 20, 100, 20000, CoinColor::Gold)], frame as u64 + 1);
    }
    assert_eq!(tracker.tracks().len(), 1);
    assert_eq!(tracker.tracks()[0].first_seen, 1);
    assert_eq!(tracker.tracks()[0].bounding_box.x, 480);
}

#[test]
fn two_coins_are_tracked_separately() {
    let mut tracker = CoinTracker::new(TrackerConfig::default());
    for frame in 1..=35 {
        let annotations = tracker.update(
            &[
                coin(0, 0, 20000, CoinColor::Gold),
                coin(400, 0, 9000, CoinColor::Copper),
            ],
            frame,
        );
        assert_eq!(annotations.len(), 2);
    }
    let counts = tracker.counts();
    assert_eq!(counts[Denomination::TwentyCents], 1);
    assert_eq!(counts[Denomination::OneCent], 1);
    assert_eq!(counts.value_cents(), 21);
}
