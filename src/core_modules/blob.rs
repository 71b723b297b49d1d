// THEORY:
// A `BlobDescriptor` is the labeler's summary of one connected region of the cleaned
// mask, in one frame. It is a "dumb" data container: it carries the measurements the
// classifier and tracker need (bounding box, area, perimeter, centroid) and nothing
// else. Its `label` is only meaningful inside the frame that produced it; identity
// across frames is the tracker's job, not the blob's.

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Integer center: `(x + width / 2, y + height / 2)`.
    pub fn center(&self) -> (i64, i64) {
        (
            self.x as i64 + (self.width / 2) as i64,
            self.y as i64 + (self.height / 2) as i64,
        )
    }

    /// Euclidean distance between the integer centers of two boxes.
    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (((ax - bx).pow(2) + (ay - by).pow(2)) as f64).sqrt()
    }

    /// Smallest box containing both `self` and the pixel (x, y).
    pub fn include(&mut self, x: u32, y: u32) {
        if self.width == 0 || self.height == 0 {
            *self = BoundingBox::new(x, y, 1, 1);
            return;
        }
        let x1 = (self.x + self.width - 1).max(x);
        let y1 = (self.y + self.height - 1).max(y);
        self.x = self.x.min(x);
        self.y = self.y.min(y);
        self.width = x1 - self.x + 1;
        self.height = y1 - self.y + 1;
    }
}

/// Geometric summary of one connected region of a binary mask.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobDescriptor {
    /// Canonical label for this frame only. Not persistent.
    pub label: u32,
    pub bounding_box: BoundingBox,
    /// Number of pixels in the region.
    pub area: u32,
    /// Number of region pixels with at least one background 4-neighbor.
    pub perimeter: u32,
    /// Mean pixel coordinate of the region.
    pub centroid: (f64, f64),
}

impl BlobDescriptor {
    pub fn center(&self) -> (i64, i64) {
        self.bounding_box.center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_grows_box_from_empty() {
        let mut bbox = BoundingBox::default();
        bbox.include(4, 7);
        assert_eq!(bbox, BoundingBox::new(4, 7, 1, 1));
        bbox.include(2, 9);
        bbox.include(6, 8);
        assert_eq!(bbox, BoundingBox::new(2, 7, 5, 3));
    }

    #[test]
    fn center_uses_integer_half_extent() {
        let bbox = BoundingBox::new(10, 20, 5, 4);
        assert_eq!(bbox.center(), (12, 22));
        let other = BoundingBox::new(13, 24, 5, 4);
        assert_eq!(bbox.center_distance(&other), 5.0);
    }
}
