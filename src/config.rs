// THEORY:
// Every threshold in the coin pipeline is a tunable. The reference values live in the
// `Default` impls below; a TOML file can override any subset of them, because every
// section and field is `#[serde(default)]`. A config is validated once, up front, so
// the per-frame code can trust it.
//
// Example:
//
// ```toml
// [filter]
// min_area = 6000
//
// [tracker]
// dwell_frames = 20
//
// [[segmentation.bands]]
// name = "gold"
// hue_min = 43
// hue_max = 72
// saturation_min = 19
// saturation_max = 70
// value_min = 7
// value_max = 64
// ```

use crate::core_modules::classifier::ColorRange;
use crate::core_modules::color_segmenter::HsvBand;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Color segmentation and mask clean-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Bands whose masks are OR-ed into the candidate foreground.
    pub bands: Vec<HsvBand>,
    /// Side of the square structuring element used for opening and closing.
    pub kernel_size: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            bands: HsvBand::coin_metals(),
            kernel_size: 3,
        }
    }
}

/// Blob filtering applied before tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Blobs with fewer pixels are discarded.
    pub min_area: u32,
    /// Blobs less circular than this are discarded.
    pub min_circularity: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_area: 7000,
            min_circularity: 0.11,
        }
    }
}

/// Coin tracker tunables. All frame counts are in frames, distances in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A blob matches a track when their centers are strictly closer than this.
    pub max_match_distance: f64,
    /// Consecutive measurements required before a classification is confirmed.
    pub stability_window: usize,
    /// Largest allowed |area - mean| / mean inside the window.
    pub max_area_variation: f64,
    /// Frames a confirmed track must have existed before it is counted.
    pub dwell_frames: u64,
    /// Frames a track may go unmatched before it is dropped.
    pub forget_frames: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_match_distance: 60.0,
            stability_window: 5,
            max_area_variation: 0.05,
            dwell_frames: 30,
            forget_frames: 70,
        }
    }
}

/// Complete configuration of a `CoinPipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationConfig,
    pub filter: FilterConfig,
    pub tracker: TrackerConfig,
    /// Ordered center-color ranges; the first containing range names the color.
    pub colors: Vec<ColorRange>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            filter: FilterConfig::default(),
            tracker: TrackerConfig::default(),
            colors: ColorRange::coin_metals(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let kernel = self.segmentation.kernel_size;
        if kernel == 0 || kernel % 2 == 0 {
            return Err(ConfigError::invalid(
                "segmentation.kernel_size",
                format!("{kernel} is not an odd, non-zero size"),
            ));
        }
        for band in &self.segmentation.bands {
            band.validate()
                .map_err(|e| ConfigError::invalid("segmentation.bands", e.to_string()))?;
        }

        let filter = &self.filter;
        if !filter.min_circularity.is_finite() || filter.min_circularity < 0.0 {
            return Err(ConfigError::invalid(
                "filter.min_circularity",
                "must be a finite, non-negative number",
            ));
        }

        let tracker = &self.tracker;
        if tracker.stability_window == 0 {
            return Err(ConfigError::invalid("tracker.stability_window", "must be at least 1"));
        }
        if !tracker.max_match_distance.is_finite() || tracker.max_match_distance <= 0.0 {
            return Err(ConfigError::invalid(
                "tracker.max_match_distance",
                "must be a finite, positive distance",
            ));
        }
        if !tracker.max_area_variation.is_finite() || tracker.max_area_variation < 0.0 {
            return Err(ConfigError::invalid(
                "tracker.max_area_variation",
                "must be a finite, non-negative fraction",
            ));
        }

        for range in &self.colors {
            let ordered = range.hue_min <= range.hue_max
                && range.saturation_min <= range.saturation_max
                && range.value_min <= range.value_max;
            if !ordered {
                return Err(ConfigError::invalid(
                    "colors",
                    format!("{} range has a minimum above its maximum", range.color),
                ));
            }
        }
        Ok(())
    }
}
