// THEORY:
// The classifier turns a blob's raw geometry into a coin decision. It has three
// independent jobs, each a pure function:
//
// 1.  **Shape**: circularity = 4*pi*area / perimeter^2. A clean disk scores near 1;
//     merged or clipped blobs score much lower. Together with a minimum area this
//     decides which blobs are worth tracking at all.
// 2.  **Color**: the pixel at the blob's bounding-box center is converted to HSV and
//     matched against an ordered table of metal ranges. The first range that contains
//     it wins; nothing matching means `Undefined`.
// 3.  **Denomination**: a fixed, priority-ordered rule table over (area, circularity,
//     color). The table is hand-tuned and its ranges overlap on purpose; the first
//     matching rule is authoritative.

use crate::config::FilterConfig;
use crate::core_modules::blob::BlobDescriptor;
use crate::core_modules::pixel::pixel::Hsv;
use crate::core_modules::pixel_buffer::PixelBuffer;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// 4*pi*area / perimeter^2, or 0 when the perimeter is 0.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter == 0.0 {
        return 0.0;
    }
    4.0 * PI * area / (perimeter * perimeter)
}

/// Radius of the disk whose area equals `area`.
pub fn equivalent_radius(area: f64) -> f64 {
    (area / PI).sqrt()
}

/// True when a blob is large and round enough to be handed to the tracker.
pub fn passes_filter(blob: &BlobDescriptor, filter: &FilterConfig) -> bool {
    if blob.area < filter.min_area {
        return false;
    }
    circularity(blob.area as f64, blob.perimeter as f64) >= filter.min_circularity
}

/// Metal color observed at a blob's center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinColor {
    Gold,
    Silver,
    Copper,
    Undefined,
}

impl fmt::Display for CoinColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoinColor::Gold => "gold",
            CoinColor::Silver => "silver",
            CoinColor::Copper => "copper",
            CoinColor::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// Inclusive HSV range for color sampling: hue in degrees, saturation and value in 0..255.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub color: CoinColor,
    pub hue_min: f32,
    pub hue_max: f32,
    pub saturation_min: f32,
    pub saturation_max: f32,
    pub value_min: f32,
    pub value_max: f32,
}

impl ColorRange {
    pub fn contains(&self, hsv: &Hsv) -> bool {
        (self.hue_min..=self.hue_max).contains(&hsv.hue)
            && (self.saturation_min..=self.saturation_max).contains(&hsv.saturation)
            && (self.value_min..=self.value_max).contains(&hsv.value)
    }

    /// The reference gold, silver and copper ranges, in matching order.
    pub fn coin_metals() -> Vec<Self> {
        let range = |color, hue: (f32, f32), sat: (f32, f32), val: (f32, f32)| ColorRange {
            color,
            hue_min: hue.0,
            hue_max: hue.1,
            saturation_min: sat.0,
            saturation_max: sat.1,
            value_min: val.0,
            value_max: val.1,
        };
        vec![
            range(CoinColor::Gold, (50.0, 60.0), (20.0, 140.0), (65.0, 150.0)),
            range(CoinColor::Silver, (30.0, 120.0), (1.0, 60.0), (10.0, 120.0)),
            range(CoinColor::Copper, (20.0, 120.0), (80.0, 215.0), (40.0, 120.0)),
        ]
    }
}

/// Classifies the RGB pixel at `point` against `ranges`; first match wins.
pub fn sample_color(frame: &PixelBuffer, point: (i64, i64), ranges: &[ColorRange]) -> CoinColor {
    let Some([red, green, blue]) = frame.rgb_at(point.0, point.1) else {
        return CoinColor::Undefined;
    };
    let hsv = Hsv::from_rgb(red, green, blue);
    ranges
        .iter()
        .find(|range| range.contains(&hsv))
        .map_or(CoinColor::Undefined, |range| range.color)
}

/// Euro coin denominations, plus `Pending` for blobs no rule recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Denomination {
    OneCent,
    TwoCents,
    FiveCents,
    TenCents,
    TwentyCents,
    FiftyCents,
    OneEuro,
    TwoEuros,
    Pending,
}

impl Denomination {
    pub const ALL: [Denomination; 9] = [
        Denomination::OneCent,
        Denomination::TwoCents,
        Denomination::FiveCents,
        Denomination::TenCents,
        Denomination::TwentyCents,
        Denomination::FiftyCents,
        Denomination::OneEuro,
        Denomination::TwoEuros,
        Denomination::Pending,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Denomination::OneCent => "1 centimo",
            Denomination::TwoCents => "2 centimos",
            Denomination::FiveCents => "5 centimos",
            Denomination::TenCents => "10 centimos",
            Denomination::TwentyCents => "20 centimos",
            Denomination::FiftyCents => "50 centimos",
            Denomination::OneEuro => "1 euro",
            Denomination::TwoEuros => "2 euros",
            Denomination::Pending => "loading",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == label)
    }

    /// Face value in cents; `None` for `Pending`.
    pub fn cents(&self) -> Option<u32> {
        match self {
            Denomination::OneCent => Some(1),
            Denomination::TwoCents => Some(2),
            Denomination::FiveCents => Some(5),
            Denomination::TenCents => Some(10),
            Denomination::TwentyCents => Some(20),
            Denomination::FiftyCents => Some(50),
            Denomination::OneEuro => Some(100),
            Denomination::TwoEuros => Some(200),
            Denomination::Pending => None,
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a measurement to a denomination using the priority-ordered rule table.
pub fn classify(area: f64, circularity: f64, color: CoinColor) -> Denomination {
    use CoinColor::*;
    use Denomination::*;

    if (8000.0..11000.0).contains(&area) && color == Copper {
        OneCent
    } else if (13000.0..15000.0).contains(&area) && circularity > 0.9 {
        TwoCents
    } else if (17000.0..18500.0).contains(&area) && circularity > 0.7 {
        FiveCents
    } else if area > 10000.0 && area <= 16800.0 && color == Gold {
        TenCents
    } else if (19000.0..22000.0).contains(&area) && color == Gold {
        TwentyCents
    } else if (10000.0..22000.0).contains(&area) && (color == Silver || circularity < 0.5) {
        OneEuro
    } else if (22300.0..=25000.0).contains(&area) {
        FiftyCents
    } else if area >= 25000.0 && color == Gold {
        TwoEuros
    } else {
        Pending
    }
}
