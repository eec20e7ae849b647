//! Shared audio state and audio processing capabilities.

use std::sync::Arc;

use crate::error::Result;

/// Echo canceller delay estimate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EchoDelayMetrics {
    /// Median delay in ms, -1 while there is not enough data
    pub median_ms: i32,
    /// Standard deviation of the delay in ms, -1 while there is not enough data
    pub std_ms: i32,
    /// Fraction of delay estimates that are too far off to be useful
    pub fraction_poor_delays: f32,
}

impl Default for EchoDelayMetrics {
    fn default() -> Self {
        Self {
            median_ms: -1,
            std_ms: -1,
            fraction_poor_delays: 0.0,
        }
    }
}

/// Echo canceller loss figures, all in dB.
///
/// Valid values can be negative, so the unknown value is the lowest
/// reportable level rather than -1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EchoMetrics {
    /// Echo return loss
    pub erl: i32,
    /// Echo return loss enhancement
    pub erle: i32,
    /// Residual echo return loss, after the non-linear processor
    pub rerl: i32,
    /// Echo return loss enhancement of the non-linear processor alone
    pub a_nlp: i32,
}

impl EchoMetrics {
    pub const UNKNOWN_LEVEL_DB: i32 = -100;
}

impl Default for EchoMetrics {
    fn default() -> Self {
        Self {
            erl: Self::UNKNOWN_LEVEL_DB,
            erle: Self::UNKNOWN_LEVEL_DB,
            rerl: Self::UNKNOWN_LEVEL_DB,
            a_nlp: Self::UNKNOWN_LEVEL_DB,
        }
    }
}

/// Read side of the capture audio processing module.
pub trait AudioProcessing: Send + Sync {
    /// Speech input level over the full 16-bit range.
    fn speech_input_level_full_range(&self) -> Result<u32>;
    /// Whether the echo canceller is currently collecting metrics.
    fn ec_metrics_enabled(&self) -> Result<bool>;
    fn ec_delay_metrics(&self) -> Result<EchoDelayMetrics>;
    fn echo_metrics(&self) -> Result<EchoMetrics>;
}

/// State shared by all audio streams of a call.
pub trait AudioState: Send + Sync {
    /// Whether keyboard typing noise is currently being detected on the capture side.
    fn typing_noise_detected(&self) -> bool;
    fn audio_processing(&self) -> Arc<dyn AudioProcessing>;
}
