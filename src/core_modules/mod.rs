pub mod annotation;
pub mod blob;
pub mod blob_detector;
pub mod classifier;
pub mod color_segmenter;
pub mod morphology;
pub mod pixel;
pub mod pixel_buffer;
pub mod tracker;
