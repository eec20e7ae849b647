//! Configuration of an outbound audio stream.
//!
//! An [`AudioSendStreamConfig`] is fixed for the lifetime of the
//! [`AudioSendStream`](crate::AudioSendStream) built from it. Changing any
//! part of it means tearing the stream down and constructing a new one.
//!
//! # Example
//!
//! ```ignore
//! use rtc_audio::config::{AudioSendStreamConfigBuilder, AUDIO_LEVEL_URI, CodecInst, SendCodecSpec};
//!
//! let config = AudioSendStreamConfigBuilder::new(channel)
//!     .with_ssrc(0x1234_5678)
//!     .with_c_name("alice")
//!     .with_extension(AUDIO_LEVEL_URI, 1)
//!     .with_nack_history_ms(5000)
//!     .with_send_codec_spec(SendCodecSpec {
//!         codec_inst: CodecInst::new(111, "opus", 48000, 960, 2, 32000),
//!         ..Default::default()
//!     })
//!     .with_bitrate_range(6000, 510000)
//!     .build()?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::channel::{Channel, CnFrequency, Transport};
use crate::error::{Error, Result};

/// The URI for the absolute send time RTP header extension.
pub const ABS_SEND_TIME_URI: &str = "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";
/// The URI for the client-to-mixer audio level RTP header extension (RFC 6464).
pub const AUDIO_LEVEL_URI: &str = "urn:ietf:params:rtp-hdrext:ssrc-audio-level";
/// The URI for the transport-wide CC RTP header extension.
pub const TRANSPORT_CC_URI: &str =
    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";

/// Packet duration used to turn the NACK history window into a packet count.
///
/// This does not track the real packet size of the configured codec.
pub const NACK_PACKET_DURATION_MS: u32 = 20;

/// Comfort noise at 8 kHz uses the static payload type 13 and needs no registration.
pub const DEFAULT_CN_FREQUENCY_HZ: u32 = 8000;

/// Send-side RTP header extensions the audio channel can write.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RtpExtensionKind {
    /// abs-send-time, used by receive-side bandwidth estimation
    AbsSendTime,
    /// ssrc-audio-level
    AudioLevel,
    /// transport-wide sequence number, used by send-side bandwidth estimation
    TransportSequenceNumber,
}

impl RtpExtensionKind {
    /// Maps an extension URI to its kind, `None` for anything the channel can't send.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            ABS_SEND_TIME_URI => Some(RtpExtensionKind::AbsSendTime),
            AUDIO_LEVEL_URI => Some(RtpExtensionKind::AudioLevel),
            TRANSPORT_CC_URI => Some(RtpExtensionKind::TransportSequenceNumber),
            _ => None,
        }
    }

    pub fn uri(&self) -> &'static str {
        match *self {
            RtpExtensionKind::AbsSendTime => ABS_SEND_TIME_URI,
            RtpExtensionKind::AudioLevel => AUDIO_LEVEL_URI,
            RtpExtensionKind::TransportSequenceNumber => TRANSPORT_CC_URI,
        }
    }
}

/// RTP header extension as negotiated via SDP (RFC 5285).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RtpHeaderExtension {
    /// URI identifying the extension type
    pub uri: String,
    /// Local identifier (1-14) used in RTP packets to reference this extension
    pub id: u16,
}

impl RtpHeaderExtension {
    pub fn new(uri: impl Into<String>, id: u16) -> Self {
        Self {
            uri: uri.into(),
            id,
        }
    }

    pub fn kind(&self) -> Option<RtpExtensionKind> {
        RtpExtensionKind::from_uri(&self.uri)
    }
}

impl fmt::Display for RtpHeaderExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{uri: {}, id: {}}}", self.uri, self.id)
    }
}

/// NACK retransmission settings.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct NackConfig {
    /// How long sent packets are kept for retransmission, 0 disables NACK.
    pub rtp_history_ms: u32,
}

impl NackConfig {
    pub fn enabled(&self) -> bool {
        self.rtp_history_ms != 0
    }

    /// History window in packets, assuming [`NACK_PACKET_DURATION_MS`] per packet.
    pub fn max_packets(&self) -> u32 {
        self.rtp_history_ms / NACK_PACKET_DURATION_MS
    }
}

impl fmt::Display for NackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{rtp_history_ms: {}}}", self.rtp_history_ms)
    }
}

/// Send-side RTP settings.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RtpConfig {
    /// Sender SSRC, unique per stream
    pub ssrc: u32,
    /// Negotiated RTP header extensions, in negotiation order
    pub extensions: Vec<RtpHeaderExtension>,
    pub nack: NackConfig,
    /// RTCP CNAME, see RFC 3550
    pub c_name: String,
}

impl RtpConfig {
    /// Every extension must be one the channel knows how to send.
    pub fn validate(&self) -> Result<()> {
        match self.extensions.iter().find(|ext| ext.kind().is_none()) {
            Some(ext) => Err(Error::ErrUnsupportedRtpExtension(ext.uri.clone())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for RtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ssrc: {}, extensions: [", self.ssrc)?;
        for (i, ext) in self.extensions.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ext}")?;
        }
        write!(f, "], nack: {}, c_name: {}}}", self.nack, self.c_name)
    }
}

/// Codec descriptor as understood by the audio channel.
#[derive(Default, Debug, Clone, Eq)]
pub struct CodecInst {
    /// RTP payload type
    pub pltype: u8,
    /// Payload name, e.g. "opus", "PCMU"
    pub plname: String,
    /// Clock rate in Hz
    pub plfreq: u32,
    /// Packet size in samples
    pub pacsize: u32,
    /// Number of audio channels
    pub channels: u16,
    /// Target bitrate in bps
    pub rate: u32,
}

impl CodecInst {
    pub fn new(
        pltype: u8,
        plname: impl Into<String>,
        plfreq: u32,
        pacsize: u32,
        channels: u16,
        rate: u32,
    ) -> Self {
        Self {
            pltype,
            plname: plname.into(),
            plfreq,
            pacsize,
            channels,
            rate,
        }
    }

    /// Case-insensitive payload name check.
    pub fn is_codec(&self, name: &str) -> bool {
        self.plname.eq_ignore_ascii_case(name)
    }
}

impl PartialEq for CodecInst {
    fn eq(&self, other: &Self) -> bool {
        self.pltype == other.pltype
            && self.plname.eq_ignore_ascii_case(&other.plname)
            && self.plfreq == other.plfreq
            && self.pacsize == other.pacsize
            && self.channels == other.channels
            && self.rate == other.rate
    }
}

impl fmt::Display for CodecInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} ({})",
            self.plname, self.plfreq, self.channels, self.pltype
        )
    }
}

/// The codec selected for sending plus the knobs negotiated around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCodecSpec {
    pub codec_inst: CodecInst,
    /// Codec internal forward error correction
    pub enable_codec_fec: bool,
    /// Opus discontinuous transmission, ignored for other codecs
    pub enable_opus_dtx: bool,
    /// Opus max playback rate in Hz, `<= 0` keeps the engine default (48 kHz)
    pub opus_max_playback_rate: i32,
    /// Comfort noise payload type, `None` disables CN and VAD
    pub cng_payload_type: Option<u8>,
    /// Comfort noise clock rate in Hz
    pub cng_plfreq: u32,
}

impl Default for SendCodecSpec {
    fn default() -> Self {
        Self {
            codec_inst: CodecInst::default(),
            enable_codec_fec: false,
            enable_opus_dtx: false,
            opus_max_playback_rate: 0,
            cng_payload_type: None,
            cng_plfreq: DEFAULT_CN_FREQUENCY_HZ,
        }
    }
}

impl SendCodecSpec {
    /// A configured CN payload type must use a clock rate the channel supports.
    pub fn validate(&self) -> Result<()> {
        if self.cng_payload_type.is_some() && self.cng_plfreq != DEFAULT_CN_FREQUENCY_HZ {
            CnFrequency::try_from(self.cng_plfreq)?;
        }
        Ok(())
    }
}

/// Checks adaptive bitrate bounds, returning the range when adaptation is enabled.
pub fn validate_bitrate_range(min: Option<u32>, max: Option<u32>) -> Result<Option<(u32, u32)>> {
    match (min, max) {
        (Some(min), Some(max)) if max < min => Err(Error::ErrInvalidBitrateRange { min, max }),
        (Some(min), Some(max)) => Ok(Some((min, max))),
        (None, None) => Ok(None),
        _ => Err(Error::ErrIncompleteBitrateRange),
    }
}

/// Complete configuration of an [`AudioSendStream`](crate::AudioSendStream).
#[derive(Clone)]
pub struct AudioSendStreamConfig {
    pub rtp: RtpConfig,
    pub send_codec_spec: SendCodecSpec,
    /// Lower adaptive bitrate bound in bps, both bounds `None` disables adaptation
    pub min_bitrate_bps: Option<u32>,
    /// Upper adaptive bitrate bound in bps
    pub max_bitrate_bps: Option<u32>,
    /// Bound on how long start/stop wait for the worker queue, `None` waits forever
    pub registration_timeout: Option<Duration>,
    /// Outgoing packet sink handed to the channel
    pub send_transport: Option<Arc<dyn Transport>>,
    /// The audio channel this stream drives
    pub channel: Arc<dyn Channel>,
}

impl AudioSendStreamConfig {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            rtp: RtpConfig::default(),
            send_codec_spec: SendCodecSpec::default(),
            min_bitrate_bps: None,
            max_bitrate_bps: None,
            registration_timeout: None,
            send_transport: None,
            channel,
        }
    }

    /// Adaptive bitrate range `(min, max)` in bps, when both bounds are set.
    pub fn bitrate_range(&self) -> Option<(u32, u32)> {
        self.min_bitrate_bps.zip(self.max_bitrate_bps)
    }

    pub fn validate(&self) -> Result<()> {
        self.rtp.validate()?;
        self.send_codec_spec.validate()?;
        validate_bitrate_range(self.min_bitrate_bps, self.max_bitrate_bps)?;
        Ok(())
    }
}

impl fmt::Debug for AudioSendStreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSendStreamConfig")
            .field("rtp", &self.rtp)
            .field("send_codec_spec", &self.send_codec_spec)
            .field("min_bitrate_bps", &self.min_bitrate_bps)
            .field("max_bitrate_bps", &self.max_bitrate_bps)
            .field("registration_timeout", &self.registration_timeout)
            .field("send_transport", &self.send_transport.is_some())
            .field("channel_id", &self.channel.id())
            .finish()
    }
}

impl fmt::Display for AudioSendStreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{rtp: {}, voe_channel_id: {}, cng_payload_type: ",
            self.rtp,
            self.channel.id()
        )?;
        match self.send_codec_spec.cng_payload_type {
            Some(pt) => write!(f, "{pt}}}"),
            None => write!(f, "-1}}"),
        }
    }
}

/// Builder for [`AudioSendStreamConfig`].
///
/// `build()` checks the configuration, so a config obtained from here can
/// always be handed to [`AudioSendStream::new`](crate::AudioSendStream::new).
pub struct AudioSendStreamConfigBuilder {
    config: AudioSendStreamConfig,
}

impl AudioSendStreamConfigBuilder {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            config: AudioSendStreamConfig::new(channel),
        }
    }

    pub fn with_ssrc(mut self, ssrc: u32) -> Self {
        self.config.rtp.ssrc = ssrc;
        self
    }

    pub fn with_c_name(mut self, c_name: impl Into<String>) -> Self {
        self.config.rtp.c_name = c_name.into();
        self
    }

    /// Appends an RTP header extension, keeping negotiation order.
    pub fn with_extension(mut self, uri: impl Into<String>, id: u16) -> Self {
        self.config
            .rtp
            .extensions
            .push(RtpHeaderExtension::new(uri, id));
        self
    }

    pub fn with_nack_history_ms(mut self, rtp_history_ms: u32) -> Self {
        self.config.rtp.nack.rtp_history_ms = rtp_history_ms;
        self
    }

    pub fn with_send_codec_spec(mut self, send_codec_spec: SendCodecSpec) -> Self {
        self.config.send_codec_spec = send_codec_spec;
        self
    }

    /// Enables adaptive bitrate between `min_bitrate_bps` and `max_bitrate_bps`.
    pub fn with_bitrate_range(mut self, min_bitrate_bps: u32, max_bitrate_bps: u32) -> Self {
        self.config.min_bitrate_bps = Some(min_bitrate_bps);
        self.config.max_bitrate_bps = Some(max_bitrate_bps);
        self
    }

    pub fn with_send_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.send_transport = Some(transport);
        self
    }

    pub fn with_registration_timeout(mut self, timeout: Duration) -> Self {
        self.config.registration_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<AudioSendStreamConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
