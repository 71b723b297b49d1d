// THEORY:
// The tracker gives the coin pipeline object permanence. Blob labels are per-frame and
// meaningless across frames; the tracker associates each frame's detections with the
// coins it already knows about, decides when a coin's measurements are stable enough
// to trust a classification, and counts every coin exactly once.
//
// Key architectural principles:
// 1.  **Greedy, ordered association**: each detection, in labeler order, is matched to
//     the *first* track (in creation order) whose center is strictly closer than
//     `max_match_distance`. A detection that matches nothing becomes a new track at
//     the end of the list, so a later detection in the same frame may match it.
// 2.  **Stability gate**: an unconfirmed track keeps a bounded window of recent
//     (area, perimeter) samples. Once the window is full and every area lies within
//     `max_area_variation` of the window mean, the mean measurements are classified
//     and frozen. An unstable window restarts from the current sample.
// 3.  **Lifecycle**:
//     - **Pending**: born from an unmatched detection, gathering samples.
//     - **Confirmed**: denomination frozen, waiting out `dwell_frames`.
//     - **Counted**: added to the tally. A track is counted at most once.
//     - **Forgotten**: unmatched for more than `forget_frames`, removed in any state.
// 4.  **One update per frame**: counting and eviction run on every frame, including
//     frames without detections, so coins leaving the scene are still forgotten.

use crate::config::TrackerConfig;
use crate::core_modules::annotation::{Annotation, AnnotationKind};
use crate::core_modules::blob::{BlobDescriptor, BoundingBox};
use crate::core_modules::classifier::{CoinColor, Denomination, circularity, classify};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::ops::Index;
use tracing::{debug, info};

/// A filtered blob together with the color sampled at its center.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub blob: BlobDescriptor,
    pub color: CoinColor,
}

/// Where a track is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Pending,
    Confirmed,
    Counted,
}

/// A coin followed across frames.
#[derive(Debug, Clone)]
pub struct Track {
    /// Diagnostic id, unique within one tracker.
    pub id: u64,
    /// Box of the most recent matching detection.
    pub bounding_box: BoundingBox,
    /// `Pending` until the classification is confirmed.
    pub denomination: Denomination,
    pub first_seen: u64,
    pub last_seen: u64,
    pub matched_this_frame: bool,
    pub counted: bool,
    pub type_confirmed: bool,
    /// Window mean area at confirmation.
    pub final_area: f64,
    pub final_perimeter: f64,
    pub final_circularity: f64,
    history: VecDeque<(u32, u32)>,
}

impl Track {
    fn new(id: u64, detection: &Detection, frame_index: u64, window: usize) -> Self {
        let mut history = VecDeque::with_capacity(window);
        history.push_back((detection.blob.area, detection.blob.perimeter));
        Self {
            id,
            bounding_box: detection.blob.bounding_box,
            denomination: Denomination::Pending,
            first_seen: frame_index,
            last_seen: frame_index,
            matched_this_frame: true,
            counted: false,
            type_confirmed: false,
            final_area: 0.0,
            final_perimeter: 0.0,
            final_circularity: 0.0,
            history,
        }
    }

    pub fn state(&self) -> TrackState {
        if self.counted {
            TrackState::Counted
        } else if self.type_confirmed {
            TrackState::Confirmed
        } else {
            TrackState::Pending
        }
    }

    /// Recent (area, perimeter) samples, oldest first. Frozen once confirmed.
    pub fn history(&self) -> &VecDeque<(u32, u32)> {
        &self.history
    }

    /// Folds a matching detection into the track.
    fn observe(&mut self, detection: &Detection, frame_index: u64, config: &TrackerConfig) {
        self.bounding_box = detection.blob.bounding_box;
        self.last_seen = frame_index;
        self.matched_this_frame = true;
        if self.type_confirmed {
            return;
        }

        self.history.push_back((detection.blob.area, detection.blob.perimeter));
        while self.history.len() > config.stability_window {
            self.history.pop_front();
        }
        if self.history.len() < config.stability_window {
            return;
        }

        let samples = self.history.len() as f64;
        let mean_area = self.history.iter().map(|&(a, _)| a as f64).sum::<f64>() / samples;
        let mean_perimeter = self.history.iter().map(|&(_, p)| p as f64).sum::<f64>() / samples;
        let tolerance = config.max_area_variation;
        let stable = mean_area > 0.0
            && self
                .history
                .iter()
                .all(|&(a, _)| (a as f64 - mean_area).abs() / mean_area <= tolerance);

        if stable {
            self.final_area = mean_area;
            self.final_perimeter = mean_perimeter;
            self.final_circularity = circularity(mean_area, mean_perimeter);
            self.denomination = classify(mean_area, self.final_circularity, detection.color);
            self.type_confirmed = true;
            info!(
                track = self.id,
                frame = frame_index,
                denomination = %self.denomination,
                area = mean_area,
                circularity = self.final_circularity,
                "classification confirmed"
            );
        } else {
            self.history.clear();
            self.history.push_back((detection.blob.area, detection.blob.perimeter));
        }
    }

    fn annotate(
        &self,
        detection: &Detection,
        kind: AnnotationKind,
        config: &TrackerConfig,
    ) -> Annotation {
        let blob = &detection.blob;
        let (label, detail) = match kind {
            AnnotationKind::New => (
                "new".to_string(),
                measurement(blob.area as f64, blob.perimeter as f64, None),
            ),
            AnnotationKind::Analyzing => {
                let c = circularity(blob.area as f64, blob.perimeter as f64);
                let provisional = classify(blob.area as f64, c, detection.color);
                (
                    provisional.label().to_string(),
                    measurement(
                        blob.area as f64,
                        blob.perimeter as f64,
                        Some((self.history.len(), config.stability_window)),
                    ),
                )
            }
            AnnotationKind::Confirmed => (
                self.denomination.label().to_string(),
                measurement(self.final_area, self.final_perimeter, None),
            ),
        };
        Annotation {
            kind,
            bounding_box: blob.bounding_box,
            center: blob.center(),
            label,
            detail,
        }
    }
}

fn measurement(area: f64, perimeter: f64, progress: Option<(usize, usize)>) -> String {
    let c = circularity(area, perimeter);
    match progress {
        Some((n, window)) => format!("(A:{area:.0} P:{perimeter:.0} C:{c:.2} {n}/{window})"),
        None => format!("(A:{area:.0} P:{perimeter:.0} C:{c:.2})"),
    }
}

/// Running tally of counted coins per denomination. Every denomination is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountTable {
    counts: BTreeMap<Denomination, u32>,
}

impl Default for CountTable {
    fn default() -> Self {
        Self {
            counts: Denomination::ALL.into_iter().map(|d| (d, 0)).collect(),
        }
    }
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, denomination: Denomination) -> u32 {
        self.counts.get(&denomination).copied().unwrap_or(0)
    }

    /// Looks a count up by its display label, e.g. `"20 centimos"`.
    pub fn get_label(&self, label: &str) -> Option<u32> {
        Denomination::from_label(label).map(|d| self.get(d))
    }

    fn increment(&mut self, denomination: Denomination) {
        *self.counts.entry(denomination).or_insert(0) += 1;
    }

    /// Sum over every denomination, `Pending` included.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Face value of the counted coins in cents. `Pending` coins add nothing.
    pub fn value_cents(&self) -> u32 {
        self.counts
            .iter()
            .filter_map(|(d, n)| d.cents().map(|c| c * n))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Denomination, u32)> + '_ {
        self.counts.iter().map(|(&d, &n)| (d, n))
    }

    pub fn non_zero(&self) -> impl Iterator<Item = (Denomination, u32)> + '_ {
        self.iter().filter(|&(_, n)| n > 0)
    }
}

impl Index<Denomination> for CountTable {
    type Output = u32;

    fn index(&self, denomination: Denomination) -> &u32 {
        self.counts.get(&denomination).unwrap_or(&0)
    }
}

impl fmt::Display for CountTable {
    /// One `<label>: <count>` line per non-zero denomination, after the total.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total: {}", self.total())?;
        for (denomination, n) in self.non_zero() {
            write!(f, "\n{denomination}: {n}")?;
        }
        Ok(())
    }
}

/// Associates detections with tracks, confirms classifications, and counts coins.
#[derive(Debug, Clone)]
pub struct CoinTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    counts: CountTable,
    next_id: u64,
}

impl CoinTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            counts: CountTable::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Live tracks in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn counts(&self) -> &CountTable {
        &self.counts
    }

    /// Processes one frame's detections and returns one annotation per detection.
    pub fn update(&mut self, detections: &[Detection], frame_index: u64) -> Vec<Annotation> {
        // --- 1. Reset per-frame flags ---
        for track in &mut self.tracks {
            track.matched_this_frame = false;
        }

        // --- 2. Association ---
        let mut annotations = Vec::with_capacity(detections.len());
        for detection in detections {
            let bbox = detection.blob.bounding_box;
            let radius = self.config.max_match_distance;
            let matched = self
                .tracks
                .iter()
                .position(|t| t.bounding_box.center_distance(&bbox) < radius);

            match matched {
                Some(i) => {
                    let track = &mut self.tracks[i];
                    track.observe(detection, frame_index, &self.config);
                    // Green from the confirming frame on, not one frame later.
                    let kind = if track.type_confirmed {
                        AnnotationKind::Confirmed
                    } else {
                        AnnotationKind::Analyzing
                    };
                    annotations.push(track.annotate(detection, kind, &self.config));
                }
                None => {
                    let track = Track::new(
                        self.next_id,
                        detection,
                        frame_index,
                        self.config.stability_window,
                    );
                    self.next_id += 1;
                    debug!(
                        track = track.id,
                        frame = frame_index,
                        area = detection.blob.area,
                        "new track"
                    );
                    annotations.push(track.annotate(detection, AnnotationKind::New, &self.config));
                    self.tracks.push(track);
                }
            }
        }

        // --- 3. Counting ---
        for track in &mut self.tracks {
            let dwelled = frame_index.saturating_sub(track.first_seen) >= self.config.dwell_frames;
            if track.type_confirmed && !track.counted && dwelled {
                track.counted = true;
                self.counts.increment(track.denomination);
                info!(
                    track = track.id,
                    frame = frame_index,
                    denomination = %track.denomination,
                    total = self.counts.total(),
                    "coin counted"
                );
            }
        }

        // --- 4. Eviction ---
        let forget = self.config.forget_frames;
        self.tracks.retain(|track| {
            let keep = frame_index.saturating_sub(track.last_seen) <= forget;
            if !keep {
                debug!(
                    track = track.id,
                    frame = frame_index,
                    state = ?track.state(),
                    "track forgotten"
                );
            }
            keep
        });

        annotations
    }
}
