//! Capabilities of the audio channel that carries a send stream.
//!
//! The channel owns the encoder, the RTP/RTCP modules and the packet path.
//! An [`AudioSendStream`](crate::AudioSendStream) only configures it and reads
//! back what it reports, so everything here is expressed as a trait that the
//! voice engine (or a test fake) implements.

use std::fmt;
use std::sync::Arc;

use crate::config::CodecInst;
use crate::congestion::CongestionControlObjects;
use crate::error::{Error, Result};

/// Sink for outgoing RTP and RTCP packets.
pub trait Transport: Send + Sync {
    /// Sends one RTP packet, returns `false` if it was dropped.
    fn send_rtp(&self, packet: &[u8]) -> bool;
    /// Sends one compound RTCP packet, returns `false` if it was dropped.
    fn send_rtcp(&self, packet: &[u8]) -> bool;
}

/// Event log the channel records RTP/RTCP activity into. Opaque to the stream.
pub trait RtcEventLog: Send + Sync {}

/// Comfort noise clock rates that need an explicit payload registration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CnFrequency {
    Freq16000Hz,
    Freq32000Hz,
}

impl CnFrequency {
    pub fn hz(&self) -> u32 {
        match *self {
            CnFrequency::Freq16000Hz => 16000,
            CnFrequency::Freq32000Hz => 32000,
        }
    }
}

impl TryFrom<u32> for CnFrequency {
    type Error = Error;

    fn try_from(hz: u32) -> Result<Self> {
        match hz {
            16000 => Ok(CnFrequency::Freq16000Hz),
            32000 => Ok(CnFrequency::Freq32000Hz),
            _ => Err(Error::ErrUnsupportedCnFrequency(hz)),
        }
    }
}

impl fmt::Display for CnFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.hz())
    }
}

/// RTCP counters for the sending side of a channel.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallStatistics {
    pub bytes_sent: u64,
    pub packets_sent: u32,
    /// Round trip time, 0 until the first RTCP report has been received
    pub rtt_ms: i64,
}

/// A report block received from the remote side in an SR or RR.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReportBlock {
    /// SSRC of the remote endpoint that sent the report
    pub sender_ssrc: u32,
    /// SSRC of the stream the block reports on
    pub source_ssrc: u32,
    /// Loss since the previous report, Q8 fixed point
    pub fraction_lost: u8,
    pub cumulative_packets_lost: u32,
    pub extended_highest_sequence_number: u32,
    /// Interarrival jitter in RTP timestamp units
    pub interarrival_jitter: u32,
    pub last_sender_report: u32,
    pub delay_since_last_sender_report: u32,
}

impl ReportBlock {
    /// Builds a block from a parsed reception report and the SSRC of the report's sender.
    pub fn from_reception_report(
        sender_ssrc: u32,
        report: &rtcp::reception_report::ReceptionReport,
    ) -> Self {
        Self {
            sender_ssrc,
            source_ssrc: report.ssrc,
            fraction_lost: report.fraction_lost,
            cumulative_packets_lost: report.total_lost,
            extended_highest_sequence_number: report.last_sequence_number,
            interarrival_jitter: report.jitter,
            last_sender_report: report.last_sender_report,
            delay_since_last_sender_report: report.delay,
        }
    }
}

/// Operations a send stream performs on its audio channel.
///
/// All methods take `&self`: the channel is shared with the network thread
/// (RTCP delivery) and the worker queue (bitrate updates) and does its own
/// synchronisation. Fallible engine calls report `Error::ErrChannel`.
pub trait Channel: Send + Sync {
    /// Engine-level channel identifier, used for logging.
    fn id(&self) -> i32;

    fn set_rtc_event_log(&self, event_log: Option<Arc<dyn RtcEventLog>>);
    fn register_sender_congestion_control_objects(&self, objects: &CongestionControlObjects);
    fn reset_congestion_control_objects(&self);

    fn set_rtcp_status(&self, enable: bool);
    fn set_local_ssrc(&self, ssrc: u32);
    fn set_rtcp_cname(&self, c_name: &str);
    /// `max_packets` is the retransmission history size in packets.
    fn set_nack_status(&self, enable: bool, max_packets: u32);

    fn register_external_transport(&self, transport: Option<Arc<dyn Transport>>);
    fn deregister_external_transport(&self);

    fn set_send_absolute_sender_time_status(&self, enable: bool, id: u16);
    fn set_send_audio_level_indication_status(&self, enable: bool, id: u16);
    fn enable_send_transport_sequence_number(&self, id: u16);

    fn start_send(&self) -> Result<()>;
    fn stop_send(&self) -> Result<()>;

    /// The codec currently used for sending, `None` if none has been set.
    fn send_codec(&self) -> Option<CodecInst>;
    fn set_send_codec(&self, codec: &CodecInst) -> Result<()>;
    fn set_vad_status(&self, enable: bool) -> Result<()>;
    fn set_codec_fec_status(&self, enable: bool) -> Result<()>;
    fn set_opus_dtx(&self, enable: bool) -> Result<()>;
    fn set_opus_max_playback_rate(&self, frequency_hz: i32) -> Result<()>;
    fn set_send_cn_payload_type(&self, payload_type: u8, frequency: CnFrequency) -> Result<()>;

    fn set_send_telephone_event_payload_type(&self, payload_type: u8) -> bool;
    fn send_telephone_event_outband(&self, event: u8, duration_ms: u32) -> bool;

    fn set_input_mute(&self, muted: bool);

    fn rtcp_statistics(&self) -> Result<CallStatistics>;
    fn remote_rtcp_report_blocks(&self) -> Vec<ReportBlock>;
    /// Hands a complete RTCP packet to the channel. May be called from the network thread.
    fn received_rtcp_packet(&self, packet: &[u8]) -> bool;

    fn set_bitrate(&self, bitrate_bps: u32);
}
