// THEORY:
// Raw color segmentation is noisy: specular highlights punch holes into coins and
// stray pixels of the right hue light up all over the background. The morphology
// stage cleans the candidate mask before it is labeled.
//
// - Erosion keeps a pixel only if its whole square neighborhood is foreground.
// - Dilation lights a pixel if anything in its neighborhood is foreground.
// - Opening (erode, then dilate) deletes specks smaller than the kernel.
// - Closing (dilate, then erode) fills gaps and holes smaller than the kernel.
//
// Neighbors that fall outside the image are simply absent: they neither erode nor
// dilate anything. All four operations require single-channel buffers of identical
// size and an odd, non-zero kernel.

use crate::core_modules::pixel_buffer::{BACKGROUND, FOREGROUND, PixelBuffer};
use crate::error::VisionError;

fn validate(src: &PixelBuffer, dst: &PixelBuffer, kernel: usize) -> Result<(), VisionError> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(VisionError::InvalidKernel(kernel));
    }
    src.ensure_channels(1)?;
    src.ensure_same_shape(dst)
}

/// Shared sweep for erosion and dilation: a pixel becomes `hit` when any in-bounds
/// neighbor has foreground state `probe`, otherwise `miss`.
fn sweep(src: &PixelBuffer, dst: &mut PixelBuffer, kernel: usize, probe: bool, hit: u8, miss: u8) {
    let offset = (kernel / 2) as i64;
    for y in 0..src.height() as i64 {
        for x in 0..src.width() as i64 {
            let mut found = false;
            'window: for ny in (y - offset)..=(y + offset) {
                for nx in (x - offset)..=(x + offset) {
                    match src.get(nx, ny, 0) {
                        Some(sample) if (sample != BACKGROUND) == probe => {
                            found = true;
                            break 'window;
                        }
                        _ => {}
                    }
                }
            }
            dst.set(x, y, 0, if found { hit } else { miss });
        }
    }
}

pub fn erode(src: &PixelBuffer, dst: &mut PixelBuffer, kernel: usize) -> Result<(), VisionError> {
    validate(src, dst, kernel)?;
    sweep(src, dst, kernel, false, BACKGROUND, FOREGROUND);
    Ok(())
}

pub fn dilate(src: &PixelBuffer, dst: &mut PixelBuffer, kernel: usize) -> Result<(), VisionError> {
    validate(src, dst, kernel)?;
    sweep(src, dst, kernel, true, FOREGROUND, BACKGROUND);
    Ok(())
}

/// Erode then dilate.
pub fn open(src: &PixelBuffer, dst: &mut PixelBuffer, kernel: usize) -> Result<(), VisionError> {
    validate(src, dst, kernel)?;
    let mut eroded = PixelBuffer::new(src.width(), src.height(), 1)?;
    erode(src, &mut eroded, kernel)?;
    dilate(&eroded, dst, kernel)
}

/// Dilate then erode.
pub fn close(src: &PixelBuffer, dst: &mut PixelBuffer, kernel: usize) -> Result<(), VisionError> {
    validate(src, dst, kernel)?;
    let mut dilated = PixelBuffer::new(src.width(), src.height(), 1)?;
    dilate(src, &mut dilated, kernel)?;
    erode(&dilated, dst, kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_square(size: u32, x0: u32, y0: u32, side: u32) -> PixelBuffer {
        let mut mask = PixelBuffer::new(size, size, 1).unwrap();
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                mask.set(x as i64, y as i64, 0, FOREGROUND);
            }
        }
        mask
    }

    #[test]
    fn open_then_close_removes_speckle_and_keeps_square() {
        let mut mask = mask_with_square(80, 20, 20, 50);
        mask.set(5, 5, 0, FOREGROUND);
        let expected = mask_with_square(80, 20, 20, 50);

        let mut opened = PixelBuffer::new(80, 80, 1).unwrap();
        let mut closed = PixelBuffer::new(80, 80, 1).unwrap();
        open(&mask, &mut opened, 3).unwrap();
        close(&opened, &mut closed, 3).unwrap();

        assert!(!closed.is_foreground(5, 5));
        assert_eq!(closed, expected);
        assert_eq!(closed.count_foreground(), 2500);
    }

    #[test]
    fn close_fills_single_pixel_hole() {
        let mut mask = mask_with_square(20, 5, 5, 9);
        mask.set(9, 9, 0, BACKGROUND);
        let mut closed = PixelBuffer::new(20, 20, 1).unwrap();
        close(&mask, &mut closed, 3).unwrap();
        assert!(closed.is_foreground(9, 9));
        assert_eq!(closed.count_foreground(), 81);
    }

    #[test]
    fn out_of_bounds_neighbors_do_not_erode_the_edge() {
        let mask = PixelBuffer::from_raw(3, 3, 1, vec![255; 9]).unwrap();
        let mut eroded = PixelBuffer::new(3, 3, 1).unwrap();
        erode(&mask, &mut eroded, 3).unwrap();
        assert_eq!(eroded.count_foreground(), 9);
    }

    #[test]
    fn dilate_grows_a_point_into_the_kernel_square() {
        let mut mask = PixelBuffer::new(7, 7, 1).unwrap();
        mask.set(3, 3, 0, FOREGROUND);
        let mut grown = PixelBuffer::new(7, 7, 1).unwrap();
        dilate(&mask, &mut grown, 5).unwrap();
        assert_eq!(grown.count_foreground(), 25);
        assert!(grown.is_foreground(1, 1) && grown.is_foreground(5, 5));
        assert!(!grown.is_foreground(0, 0));
    }

    #[test]
    fn rejects_bad_kernels_and_shapes() {
        let mask = PixelBuffer::new(4, 4, 1).unwrap();
        let mut dst = PixelBuffer::new(4, 4, 1).unwrap();
        assert_eq!(erode(&mask, &mut dst, 2), Err(VisionError::InvalidKernel(2)));
        assert_eq!(dilate(&mask, &mut dst, 0), Err(VisionError::InvalidKernel(0)));

        let mut small = PixelBuffer::new(3, 4, 1).unwrap();
        assert!(matches!(
            open(&mask, &mut small, 3),
            Err(VisionError::DimensionMismatch { .. })
        ));
        let rgb = PixelBuffer::new(4, 4, 3).unwrap();
        assert!(matches!(
            close(&rgb, &mut dst, 3),
            Err(VisionError::ChannelMismatch { .. })
        ));
    }
}
