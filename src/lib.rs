// THEORY:
// This file is the main entry point for the `coin_vision` library crate. It exposes the
// `CoinPipeline` and its configuration and report types as the high-level interface
// for counting coins in a stream of frames.
//
// The individual stages (`core_modules`) stay public so each one can be used and
// tested on its own: segmentation, morphology, labeling, classification and tracking
// are all plain functions or small owned structs with no hidden global state.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{ConfigError, VisionError};
pub use pipeline::{CoinPipeline, FrameReport};
