// THEORY:
// The `blob_detector` is the engine of the spatial grouping layer. It turns the
// cleaned binary mask into a list of `BlobDescriptor`s, one per connected region,
// using classic two-pass connected-component labeling.
//
// Key architectural principles & algorithm steps:
// 1.  **Explicit Border**: Before labeling, the outermost rows and columns of the
//     working label image are forced to background. Every interior pixel therefore has
//     all eight neighbors in range, and the raster scans never need a bounds check.
//     This step is its own function so it can be tested on its own.
// 2.  **First Pass (Provisional Labels)**: Scanning in raster order, each foreground
//     pixel looks at the four neighbors already visited (up-left, up, up-right, left).
//     With no labeled neighbor it gets a fresh label; otherwise it takes the smallest
//     neighbor root and every neighbor's set is merged into that root.
// 3.  **Union-Find Equivalences**: Merges are recorded in a `LabelTable` whose root
//     is always the smallest label of its set. `find` compresses paths, so resolving a
//     label is near-constant time instead of a rescan of the whole table.
// 4.  **Second Pass (Measurement)**: Each pixel is rewritten to its canonical label
//     while area, centroid sums and perimeter are accumulated. A pixel counts once
//     towards the perimeter if any of its 4-neighbors is background.
// 5.  **Bounding Boxes**: A final scan unions every labeled pixel's coordinate into
//     its label's box.
// 6.  **Stateless Utility**: `find_blobs` knows nothing about previous frames. An
//     all-background mask is a normal, empty result; only a table overflow or an
//     allocation failure is an error.

use crate::core_modules::blob::{BlobDescriptor, BoundingBox};
use crate::core_modules::pixel_buffer::{BACKGROUND, FOREGROUND, PixelBuffer, try_filled};
use crate::error::VisionError;

/// Output of one labeling run.
#[derive(Debug, Clone)]
pub struct Labeling {
    /// 255 wherever a pixel received a label, 0 elsewhere. Same size as the input mask.
    pub label_map: PixelBuffer,
    /// One descriptor per canonical label, ordered by label.
    pub blobs: Vec<BlobDescriptor>,
}

impl Labeling {
    pub fn count(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

pub mod blob_detector {
    use super::*;

    const NO_LABEL: u32 = 0;
    const UNLABELED_FOREGROUND: u32 = u32::MAX;

    /// Union-find table over provisional labels. Label 0 is reserved for background.
    pub struct LabelTable {
        parent: Vec<u32>,
        capacity: usize,
    }

    impl LabelTable {
        pub fn with_capacity(capacity: usize) -> Self {
            Self {
                parent: vec![NO_LABEL],
                capacity,
            }
        }

        /// Number of provisional labels issued so far, including the background slot.
        pub fn len(&self) -> usize {
            self.parent.len()
        }

        pub fn is_empty(&self) -> bool {
            self.parent.len() <= 1
        }

        /// Issues a fresh provisional label.
        pub fn make_label(&mut self) -> Result<u32, VisionError> {
            let label = self.parent.len();
            if label >= self.capacity || label >= UNLABELED_FOREGROUND as usize {
                return Err(VisionError::LabelOverflow {
                    capacity: self.capacity,
                });
            }
            self.parent
                .try_reserve(1)
                .map_err(|_| VisionError::Allocation {
                    bytes: (label + 1) * std::mem::size_of::<u32>(),
                })?;
            self.parent.push(label as u32);
            Ok(label as u32)
        }

        /// Canonical (smallest) label of the set containing `label`.
        pub fn find(&mut self, label: u32) -> u32 {
            let mut root = label;
            while self.parent[root as usize] != root {
                root = self.parent[root as usize];
            }
            let mut current = label;
            while self.parent[current as usize] != root {
                let next = self.parent[current as usize];
                self.parent[current as usize] = root;
                current = next;
            }
            root
        }

        /// Merges the sets of `a` and `b`; the smaller root survives. Returns that root.
        pub fn union(&mut self, a: u32, b: u32) -> u32 {
            let root_a = self.find(a);
            let root_b = self.find(b);
            if root_a == root_b {
                return root_a;
            }
            let (low, high) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[high as usize] = low;
            low
        }
    }

    /// Sets the first and last row and column of a row-major label image to background.
    pub fn force_border_background(labels: &mut [u32], width: usize, height: usize) {
        if width == 0 || height == 0 {
            return;
        }
        for x in 0..width {
            labels[x] = NO_LABEL;
            labels[(height - 1) * width + x] = NO_LABEL;
        }
        for y in 0..height {
            labels[y * width] = NO_LABEL;
            labels[y * width + width - 1] = NO_LABEL;
        }
    }

    /// Labels every connected region of `mask`.
    pub fn find_blobs(mask: &PixelBuffer) -> Result<Labeling, VisionError> {
        let capacity = mask.width() as usize * mask.height() as usize;
        find_blobs_with_table_capacity(mask, capacity)
    }

    /// Same as [`find_blobs`] with an explicit limit on provisional labels.
    pub fn find_blobs_with_table_capacity(
        mask: &PixelBuffer,
        capacity: usize,
    ) -> Result<Labeling, VisionError> {
        mask.ensure_channels(1)?;
        let width = mask.width() as usize;
        let height = mask.height() as usize;

        let mut labels = try_filled(width * height, NO_LABEL)?;
        for y in 0..height {
            for x in 0..width {
                if mask.is_foreground(x as i64, y as i64) {
                    labels[y * width + x] = UNLABELED_FOREGROUND;
                }
            }
        }
        force_border_background(&mut labels, width, height);

        // --- 1. Provisional labels ---
        let mut table = LabelTable::with_capacity(capacity);
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                let i = y * width + x;
                if labels[i] == NO_LABEL {
                    continue;
                }
                let neighbors = [
                    labels[i - width - 1],
                    labels[i - width],
                    labels[i - width + 1],
                    labels[i - 1],
                ];

                let mut smallest: Option<u32> = None;
                for &neighbor in neighbors.iter().filter(|&&n| n != NO_LABEL) {
                    let root = table.find(neighbor);
                    smallest = Some(smallest.map_or(root, |s| s.min(root)));
                }

                labels[i] = match smallest {
                    None => table.make_label()?,
                    Some(root) => {
                        for &neighbor in neighbors.iter().filter(|&&n| n != NO_LABEL) {
                            table.union(root, neighbor);
                        }
                        root
                    }
                };
            }
        }

        // --- 2. Resolve labels, measure area, centroid and perimeter ---
        let label_count = table.len();
        let mut area = try_filled(label_count, 0u32)?;
        let mut perimeter = try_filled(label_count, 0u32)?;
        let mut sum_x = try_filled(label_count, 0u64)?;
        let mut sum_y = try_filled(label_count, 0u64)?;

        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                let i = y * width + x;
                if labels[i] == NO_LABEL {
                    continue;
                }
                let root = table.find(labels[i]);
                labels[i] = root;

                let slot = root as usize;
                area[slot] += 1;
                sum_x[slot] += x as u64;
                sum_y[slot] += y as u64;

                let touches_background = [i - width, i + width, i - 1, i + 1]
                    .iter()
                    .any(|&n| labels[n] == NO_LABEL);
                if touches_background {
                    perimeter[slot] += 1;
                }
            }
        }

        // --- 3. One descriptor per canonical label ---
        let mut slot_of_label = try_filled(label_count, usize::MAX)?;
        let mut blobs: Vec<BlobDescriptor> = Vec::new();
        for label in 1..label_count as u32 {
            let slot = label as usize;
            if table.find(label) != label || area[slot] == 0 {
                continue;
            }
            slot_of_label[slot] = blobs.len();
            blobs.push(BlobDescriptor {
                label,
                bounding_box: BoundingBox::default(),
                area: area[slot],
                perimeter: perimeter[slot],
                centroid: (
                    sum_x[slot] as f64 / area[slot] as f64,
                    sum_y[slot] as f64 / area[slot] as f64,
                ),
            });
        }

        // --- 4. Bounding boxes and label map ---
        let mut label_map = PixelBuffer::new(mask.width(), mask.height(), 1)?;
        for y in 0..height {
            for x in 0..width {
                let label = labels[y * width + x];
                if label == NO_LABEL {
                    label_map.set(x as i64, y as i64, 0, BACKGROUND);
                    continue;
                }
                label_map.set(x as i64, y as i64, 0, FOREGROUND);
                let slot = slot_of_label[label as usize];
                if let Some(blob) = blobs.get_mut(slot) {
                    blob.bounding_box.include(x as u32, y as u32);
                }
            }
        }

        Ok(Labeling { label_map, blobs })
    }
}
