//! Send stream statistics.
//!
//! A snapshot merges three sources: the channel's RTCP counters and remote
//! report blocks, the capture side audio processing, and the shared audio
//! state. Every source is read best effort; a failing read leaves its field
//! at the default instead of failing the snapshot.

use log::debug;
use serde::Serialize;

use crate::audio_state::{AudioState, EchoDelayMetrics, EchoMetrics};
use crate::channel::{Channel, ReportBlock};

/// Echo canceller figures, only reported while echo metrics are enabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoStats {
    pub echo_delay_median_ms: i32,
    pub echo_delay_std_ms: i32,
    pub echo_return_loss: i32,
    pub echo_return_loss_enhancement: i32,
}

impl Default for EchoStats {
    fn default() -> Self {
        let delay = EchoDelayMetrics::default();
        let echo = EchoMetrics::default();
        Self {
            echo_delay_median_ms: delay.median_ms,
            echo_delay_std_ms: delay.std_ms,
            echo_return_loss: echo.erl,
            echo_return_loss_enhancement: echo.erle,
        }
    }
}

/// Point-in-time statistics of an [`AudioSendStream`](crate::AudioSendStream).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSendStreamStats {
    pub local_ssrc: u32,
    pub bytes_sent: u64,
    pub packets_sent: u32,
    /// Unknown until the first RTCP report from the remote side arrives.
    pub rtt_ms: Option<i64>,
    pub codec_name: String,

    // From the remote report block about `local_ssrc`.
    pub packets_lost: Option<u32>,
    /// Fraction of packets lost since the previous report, 0.0 to 1.0.
    pub fraction_lost: Option<f32>,
    pub ext_seqnum: Option<u32>,
    pub jitter_ms: Option<u32>,

    /// Speech input level over the full 16-bit range.
    pub audio_level: i32,
    /// Not measured, always -1.
    pub aec_quality_min: f32,
    pub echo: Option<EchoStats>,
    pub typing_noise_detected: bool,
}

impl Default for AudioSendStreamStats {
    fn default() -> Self {
        Self {
            local_ssrc: 0,
            bytes_sent: 0,
            packets_sent: 0,
            rtt_ms: None,
            codec_name: String::new(),
            packets_lost: None,
            fraction_lost: None,
            ext_seqnum: None,
            jitter_ms: None,
            audio_level: 0,
            aec_quality_min: -1.0,
            echo: None,
            typing_noise_detected: false,
        }
    }
}

/// Converts a Q8 fixed point loss fraction to a float.
pub(crate) fn q8_to_float(v: u8) -> f32 {
    f32::from(v) / 256.0
}

/// Converts RTP timestamp units to ms, `None` when the clock rate is below 1 kHz.
pub(crate) fn jitter_to_ms(jitter: u32, clock_rate: u32) -> Option<u32> {
    let clock_rate_khz = clock_rate / 1000;
    if clock_rate_khz > 0 {
        Some(jitter / clock_rate_khz)
    } else {
        None
    }
}

pub(crate) fn collect(
    local_ssrc: u32,
    channel: &dyn Channel,
    audio_state: &dyn AudioState,
) -> AudioSendStreamStats {
    let mut stats = AudioSendStreamStats {
        local_ssrc,
        ..Default::default()
    };

    match channel.rtcp_statistics() {
        Ok(call_stats) => {
            stats.bytes_sent = call_stats.bytes_sent;
            stats.packets_sent = call_stats.packets_sent;
            // The channel reports 0 until an RTCP report has been received.
            if call_stats.rtt_ms > 0 {
                stats.rtt_ms = Some(call_stats.rtt_ms);
            }
        }
        Err(err) => debug!("rtcp statistics unavailable for ssrc {local_ssrc}: {err}"),
    }

    if let Some(codec) = channel.send_codec() {
        stats.codec_name = codec.plname.clone();

        let blocks = channel.remote_rtcp_report_blocks();
        if let Some(block) = find_report_block(&blocks, local_ssrc) {
            stats.packets_lost = Some(block.cumulative_packets_lost);
            stats.fraction_lost = Some(q8_to_float(block.fraction_lost));
            stats.ext_seqnum = Some(block.extended_highest_sequence_number);
            stats.jitter_ms = jitter_to_ms(block.interarrival_jitter, codec.plfreq);
        }
    }

    let processing = audio_state.audio_processing();
    match processing.speech_input_level_full_range() {
        Ok(level) => stats.audio_level = i32::try_from(level).unwrap_or(i32::MAX),
        Err(err) => debug!("speech input level unavailable: {err}"),
    }

    let echo_metrics_on = processing.ec_metrics_enabled().unwrap_or_else(|err| {
        debug!("echo metrics status unavailable: {err}");
        false
    });
    if echo_metrics_on {
        let mut echo = EchoStats::default();
        match processing.ec_delay_metrics() {
            Ok(delay) => {
                echo.echo_delay_median_ms = delay.median_ms;
                echo.echo_delay_std_ms = delay.std_ms;
            }
            Err(err) => debug!("echo delay metrics unavailable: {err}"),
        }
        match processing.echo_metrics() {
            Ok(metrics) => {
                echo.echo_return_loss = metrics.erl;
                echo.echo_return_loss_enhancement = metrics.erle;
            }
            Err(err) => debug!("echo metrics unavailable: {err}"),
        }
        stats.echo = Some(echo);
    }

    stats.typing_noise_detected = audio_state.typing_noise_detected();

    stats
}

/// The first block reporting on `ssrc`; only one is expected.
fn find_report_block(blocks: &[ReportBlock], ssrc: u32) -> Option<&ReportBlock> {
    blocks.iter().find(|block| block.source_ssrc == ssrc)
}
