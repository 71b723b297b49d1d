// THEORY:
// The core never draws on the frames it analyzes. Instead, the tracker describes what
// a renderer should show for every blob it processed this frame, as a list of
// `Annotation`s: where the box is, which state the coin is in, and the text to put
// next to it. The colors follow the tracker's lifecycle:
//
// - red   : a blob that started a new track this frame
// - blue  : a track still gathering a stable run of measurements
// - green : a track whose denomination is confirmed
//
// The small drawing helpers at the bottom are for callers that want a quick visual
// without pulling in a rendering stack. They clip to the frame and never fail.

use crate::core_modules::blob::BoundingBox;
use crate::core_modules::pixel_buffer::PixelBuffer;

/// Lifecycle stage a directive was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    New,
    Analyzing,
    Confirmed,
}

impl AnnotationKind {
    /// RGB color the renderer should use.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            AnnotationKind::New => [255, 0, 0],
            AnnotationKind::Analyzing => [0, 0, 255],
            AnnotationKind::Confirmed => [0, 255, 0],
        }
    }
}

/// One drawing directive for the rendering collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub bounding_box: BoundingBox,
    pub center: (i64, i64),
    /// Headline text: the (provisional) denomination, or "new".
    pub label: String,
    /// Measurement text, e.g. `(A:20000 P:452 C:1.23 3/5)`.
    pub detail: String,
}

impl Annotation {
    pub fn color(&self) -> [u8; 3] {
        self.kind.rgb()
    }
}

/// Draws a rectangle outline `thickness` pixels wide, growing inwards. Clipped to the frame.
pub fn draw_rectangle(frame: &mut PixelBuffer, rect: &BoundingBox, color: [u8; 3], thickness: u32) {
    let x0 = rect.x as i64;
    let y0 = rect.y as i64;
    let x1 = x0 + rect.width as i64 - 1;
    let y1 = y0 + rect.height as i64 - 1;

    for t in 0..thickness as i64 {
        for x in x0..=x1 {
            frame.set_rgb(x, y0 + t, color);
            frame.set_rgb(x, y1 - t, color);
        }
        for y in y0..=y1 {
            frame.set_rgb(x0 + t, y, color);
            frame.set_rgb(x1 - t, y, color);
        }
    }
}

/// Fills the square of half-width `radius` around `center`. Clipped to the frame.
pub fn draw_center(frame: &mut PixelBuffer, center: (i64, i64), radius: i64, color: [u8; 3]) {
    for y in center.1 - radius..=center.1 + radius {
        for x in center.0 - radius..=center.0 + radius {
            frame.set_rgb(x, y, color);
        }
    }
}

/// Draws every annotation's box and center marker.
pub fn draw_annotations(frame: &mut PixelBuffer, annotations: &[Annotation]) {
    for annotation in annotations {
        draw_rectangle(frame, &annotation.bounding_box, annotation.color(), 3);
        draw_center(frame, annotation.center, 2, annotation.color());
    }
}
