// THEORY:
// Every stage of the coin pipeline works on a single frame, and every failure it can
// hit is scoped to that frame. The `VisionError` enum is the one vocabulary all the
// stages share for reporting those failures upward. The pipeline never panics on a
// bad buffer: it returns one of these, leaves the tracker untouched, and the caller
// simply moves on to the next frame.
//
// `ConfigError` is kept separate because configuration is loaded once, before any
// frame is processed, and its failures (missing file, malformed TOML, a nonsensical
// threshold) are fatal to start-up rather than to a frame.

use thiserror::Error;

/// Failures raised by a pipeline stage while processing one frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VisionError {
    #[error(
        "dimension mismatch: expected {expected_width}x{expected_height}, \
         found {found_width}x{found_height}"
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },
    #[error("channel mismatch: expected {expected} channel(s), found {found}")]
    ChannelMismatch { expected: u8, found: u8 },
    #[error("invalid buffer geometry: {0}")]
    InvalidBuffer(String),
    #[error("invalid morphology kernel size {0}: must be odd and non-zero")]
    InvalidKernel(usize),
    #[error("invalid HSV band: {0}")]
    InvalidBand(String),
    #[error("label table overflow: more than {capacity} provisional labels")]
    LabelOverflow { capacity: usize },
    #[error("allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },
    #[error("frame {got} received after frame {last}; frames must be processed in order")]
    FrameOutOfOrder { last: u64, got: u64 },
}

/// Failures raised while loading or validating a `PipelineConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
