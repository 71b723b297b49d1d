// THEORY:
// The color segmenter is the first stage of the coin pipeline. It answers a single
// question per pixel: "could this be coin metal?"
//
// Key architectural principles:
// 1.  **HSV, not RGB**: Coin metals are separated far more cleanly by hue and
//     saturation than by raw channel values, which swing with lighting. The frame is
//     therefore converted once into a quantized HSV buffer (all three channels in
//     0..255) and every band is tested against that buffer.
// 2.  **Native-Unit Bands**: Bands are written the way a human tunes them (hue in
//     degrees, saturation and value in percent) and are rescaled into quantized units
//     only at test time.
// 3.  **Union of Metals**: Copper, gold and silver each get their own band. Their
//     masks are OR-ed into one candidate foreground mask, so a single labeling pass
//     sees every coin regardless of metal.
// 4.  **Validate, Then Write**: Every operation checks shapes and channel counts
//     before it touches the destination. A failed call leaves `dst` exactly as it was.

use crate::core_modules::pixel::pixel::Hsv;
use crate::core_modules::pixel_buffer::{BACKGROUND, FOREGROUND, PixelBuffer};
use crate::error::VisionError;
use serde::{Deserialize, Serialize};

/// An inclusive HSV range in native units: hue in degrees, saturation/value in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsvBand {
    /// Human-readable tag, used only in logs.
    #[serde(default)]
    pub name: String,
    pub hue_min: u16,
    pub hue_max: u16,
    pub saturation_min: u8,
    pub saturation_max: u8,
    pub value_min: u8,
    pub value_max: u8,
}

impl HsvBand {
    pub fn new(
        name: &str,
        hue: (u16, u16),
        saturation: (u8, u8),
        value: (u8, u8),
    ) -> Self {
        Self {
            name: name.to_string(),
            hue_min: hue.0,
            hue_max: hue.1,
            saturation_min: saturation.0,
            saturation_max: saturation.1,
            value_min: value.0,
            value_max: value.1,
        }
    }

    pub fn copper() -> Self {
        Self::new("copper", (20, 40), (30, 100), (10, 50))
    }

    pub fn gold() -> Self {
        Self::new("gold", (43, 72), (19, 70), (7, 64))
    }

    pub fn silver() -> Self {
        Self::new("silver", (50, 150), (1, 25), (10, 55))
    }

    /// The reference copper, gold and silver bands.
    pub fn coin_metals() -> Vec<Self> {
        vec![Self::copper(), Self::gold(), Self::silver()]
    }

    pub fn validate(&self) -> Result<(), VisionError> {
        let fail =
            |reason: String| Err(VisionError::InvalidBand(format!("{}: {reason}", self.name)));
        if self.hue_max > 360 {
            return fail(format!("hue_max {} exceeds 360 degrees", self.hue_max));
        }
        if self.saturation_max > 100 || self.value_max > 100 {
            return fail("saturation and value are percentages (0..=100)".into());
        }
        if self.hue_min > self.hue_max
            || self.saturation_min > self.saturation_max
            || self.value_min > self.value_max
        {
            return fail("minimum exceeds maximum".into());
        }
        Ok(())
    }

    /// The band rescaled to quantized HSV units: `[h_min, h_max, s_min, s_max, v_min, v_max]`.
    pub fn quantized(&self) -> [u8; 6] {
        let hue = |deg: u16| (deg as f32 * 255.0 / 360.0) as u8;
        let percent = |p: u8| (p as f32 * 255.0 / 100.0) as u8;
        [
            hue(self.hue_min),
            hue(self.hue_max),
            percent(self.saturation_min),
            percent(self.saturation_max),
            percent(self.value_min),
            percent(self.value_max),
        ]
    }
}

/// Converts an RGB buffer into a quantized HSV buffer of the same size.
pub fn rgb_to_hsv(src: &PixelBuffer, dst: &mut PixelBuffer) -> Result<(), VisionError> {
    src.ensure_channels(3)?;
    src.ensure_same_shape(dst)?;

    for y in 0..src.height() as i64 {
        for x in 0..src.width() as i64 {
            if let Some([red, green, blue]) = src.rgb_at(x, y) {
                let quantized = Hsv::from_rgb(red, green, blue).quantize();
                dst.set_rgb(x, y, quantized);
            }
        }
    }
    Ok(())
}

/// Allocating form of [`rgb_to_hsv`].
pub fn to_hsv(src: &PixelBuffer) -> Result<PixelBuffer, VisionError> {
    src.ensure_channels(3)?;
    let mut hsv = PixelBuffer::new(src.width(), src.height(), 3)?;
    rgb_to_hsv(src, &mut hsv)?;
    Ok(hsv)
}

/// Writes 255 into `dst` wherever the HSV pixel lies inside `band`, 0 elsewhere.
pub fn segment(
    hsv: &PixelBuffer,
    band: &HsvBand,
    dst: &mut PixelBuffer,
) -> Result<(), VisionError> {
    hsv.ensure_channels(3)?;
    dst.ensure_channels(1)?;
    hsv.ensure_same_size(dst)?;
    band.validate()?;

    let [h_min, h_max, s_min, s_max, v_min, v_max] = band.quantized();
    for y in 0..hsv.height() as i64 {
        for x in 0..hsv.width() as i64 {
            let Some([h, s, v]) = hsv.rgb_at(x, y) else {
                continue;
            };
            let inside = (h_min..=h_max).contains(&h)
                && (s_min..=s_max).contains(&s)
                && (v_min..=v_max).contains(&v);
            dst.set(x, y, 0, if inside { FOREGROUND } else { BACKGROUND });
        }
    }
    Ok(())
}

/// Logical OR of two binary masks.
pub fn join_masks(
    first: &PixelBuffer,
    second: &PixelBuffer,
    dst: &mut PixelBuffer,
) -> Result<(), VisionError> {
    first.ensure_channels(1)?;
    first.ensure_same_shape(second)?;
    first.ensure_same_shape(dst)?;

    for y in 0..first.height() as i64 {
        for x in 0..first.width() as i64 {
            let on = first.is_foreground(x, y) || second.is_foreground(x, y);
            dst.set(x, y, 0, if on { FOREGROUND } else { BACKGROUND });
        }
    }
    Ok(())
}

/// Segments every band and unions the results into one candidate mask.
/// An empty band list yields an all-background mask.
pub fn segment_bands(hsv: &PixelBuffer, bands: &[HsvBand]) -> Result<PixelBuffer, VisionError> {
    hsv.ensure_channels(3)?;
    let mut combined = PixelBuffer::new(hsv.width(), hsv.height(), 1)?;
    let mut band_mask = PixelBuffer::new(hsv.width(), hsv.height(), 1)?;
    let mut joined = PixelBuffer::new(hsv.width(), hsv.height(), 1)?;

    for band in bands {
        segment(hsv, band, &mut band_mask)?;
        join_masks(&combined, &band_mask, &mut joined)?;
        std::mem::swap(&mut combined, &mut joined);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(pixels: &[[u8; 3]]) -> PixelBuffer {
        let data = pixels.iter().flatten().copied().collect();
        PixelBuffer::from_raw(pixels.len() as u32, 1, 3, data).unwrap()
    }

    #[test]
    fn band_quantization_matches_truncating_rescale() {
        // 43 deg -> 30.45 -> 30, 72 deg -> 51; 19% -> 48.45 -> 48, 70% -> 178.5 -> 178.
        assert_eq!(HsvBand::gold().quantized(), [30, 51, 48, 178, 17, 163]);
    }

    #[test]
    fn band_validation() {
        assert!(HsvBand::silver().validate().is_ok());
        assert!(HsvBand::new("bad", (0, 361), (0, 10), (0, 10)).validate().is_err());
        assert!(HsvBand::new("bad", (0, 10), (0, 101), (0, 10)).validate().is_err());
        assert!(HsvBand::new("bad", (50, 10), (0, 10), (0, 10)).validate().is_err());
    }

    #[test]
    fn gold_pixel_segments_only_into_gold_band() {
        // Hue 52.5 deg, saturation 85/255 (33%), value 120/255 (47%).
        let frame = rgb_frame(&[[120, 115, 80], [0, 0, 0]]);
        let hsv = to_hsv(&frame).unwrap();
        let mut mask = PixelBuffer::new(2, 1, 1).unwrap();

        segment(&hsv, &HsvBand::gold(), &mut mask).unwrap();
        assert_eq!(mask.row(0), Some(&[255, 0][..]));

        segment(&hsv, &HsvBand::copper(), &mut mask).unwrap();
        assert_eq!(mask.row(0), Some(&[0, 0][..]));

        segment(&hsv, &HsvBand::silver(), &mut mask).unwrap();
        assert_eq!(mask.row(0), Some(&[0, 0][..]));
    }

    #[test]
    fn union_is_foreground_if_any_band_matches() {
        let frame = rgb_frame(&[[120, 115, 80], [0, 0, 0], [255, 255, 255]]);
        let hsv = to_hsv(&frame).unwrap();
        let mask = segment_bands(&hsv, &HsvBand::coin_metals()).unwrap();
        assert_eq!(mask.row(0), Some(&[255, 0, 0][..]));

        let empty = segment_bands(&hsv, &[]).unwrap();
        assert_eq!(empty.count_foreground(), 0);
    }

    #[test]
    fn mismatch_leaves_destination_untouched() {
        let frame = rgb_frame(&[[120, 115, 80], [1, 2, 3]]);
        let hsv = to_hsv(&frame).unwrap();
        let mut wrong_size = PixelBuffer::from_raw(3, 1, 1, vec![7, 7, 7]).unwrap();
        assert!(segment(&hsv, &HsvBand::gold(), &mut wrong_size).is_err());
        assert_eq!(wrong_size.row(0), Some(&[7, 7, 7][..]));

        let gray = PixelBuffer::new(2, 1, 1).unwrap();
        let mut dst = PixelBuffer::new(2, 1, 3).unwrap();
        assert_eq!(
            rgb_to_hsv(&gray, &mut dst),
            Err(VisionError::ChannelMismatch {
                expected: 3,
                found: 1
            })
        );
        assert!(dst.data().iter().all(|&v| v == 0));
    }
}
