// THEORY (1D Pixel Heuristics):
// The `pixel` module holds the color math that can be computed from one RGB pixel
// alone, with no knowledge of neighbors in space or time. Both the color segmenter
// (which converts a whole frame) and the classifier (which samples a single pixel at
// a blob's center) go through the same conversion here, so the two can never drift
// apart.
//
// Conventions:
// - hue is an angle in degrees [0, 360)
// - saturation is chroma / max, scaled to 0..255
// - value is the max channel, 0..255
// A gray pixel (max == min) or a black pixel (max == 0) has hue 0 and saturation 0.
//
// The quantized form packs all three into bytes for storage in a 3-channel
// `PixelBuffer`: hue is linearly rescaled from degrees to 0..255 and every channel
// is truncated, not rounded.

pub mod pixel {
    pub type Channel = u8;
    pub type Hue = f32;
    pub type Saturation = f32;
    pub type Value = f32;

    /// HSV representation of a single pixel in native units.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Hsv {
        /// Hue angle in degrees [0, 360).
        pub hue: Hue,
        /// Saturation scaled to 0..255.
        pub saturation: Saturation,
        /// Value (brightest channel) in 0..255.
        pub value: Value,
    }

    impl Hsv {
        /// Converts an RGB triple to HSV.
        pub fn from_rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            let red = red as f32;
            let green = green as f32;
            let blue = blue as f32;

            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            if maximum_channel == 0.0 || chroma == 0.0 {
                return Hsv {
                    hue: 0.0,
                    saturation: 0.0,
                    value: maximum_channel,
                };
            }

            let (base_difference, sector_offset) = if maximum_channel == red {
                (green - blue, 0.0)
            } else if maximum_channel == green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference / chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }

            Hsv {
                hue: hue_degrees,
                saturation: chroma / maximum_channel * 255.0,
                value: maximum_channel,
            }
        }

        /// Packs hue, saturation and value into bytes, hue rescaled from degrees.
        pub fn quantize(&self) -> [Channel; 3] {
            [
                (self.hue / 360.0 * 255.0) as Channel,
                self.saturation as Channel,
                self.value as Channel,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::Hsv;

    #[test]
    fn primaries_land_on_their_sectors() {
        assert_eq!(Hsv::from_rgb(255, 0, 0).hue, 0.0);
        assert_eq!(Hsv::from_rgb(0, 255, 0).hue, 120.0);
        assert_eq!(Hsv::from_rgb(0, 0, 255).hue, 240.0);
        assert_eq!(Hsv::from_rgb(255, 0, 0).saturation, 255.0);
    }

    #[test]
    fn red_with_more_blue_wraps_past_300_degrees() {
        let hsv = Hsv::from_rgb(255, 0, 128);
        assert!(hsv.hue > 300.0 && hsv.hue < 360.0, "hue was {}", hsv.hue);
    }

    #[test]
    fn gray_and_black_are_degenerate() {
        let gray = Hsv::from_rgb(90, 90, 90);
        assert_eq!((gray.hue, gray.saturation, gray.value), (0.0, 0.0, 90.0));
        let black = Hsv::from_rgb(0, 0, 0);
        assert_eq!(black.quantize(), [0, 0, 0]);
    }

    #[test]
    fn quantization_truncates() {
        // Hue 120 degrees -> 85.0 exactly; 240 degrees -> 170.
        assert_eq!(Hsv::from_rgb(0, 200, 0).quantize(), [85, 255, 200]);
        assert_eq!(Hsv::from_rgb(0, 0, 100).quantize(), [170, 255, 100]);
    }
}
