//! Applies a [`SendCodecSpec`] to a channel.
//!
//! The order of the steps matters: FEC, DTX and max playback rate are codec
//! features and can only be switched once the codec is selected, and VAD
//! depends on whether the selected codec is mono.

use log::{info, warn};

use crate::channel::{Channel, CnFrequency};
use crate::config::{DEFAULT_CN_FREQUENCY_HZ, SendCodecSpec};
use crate::error::{Error, Result};

/// Payload name of the Opus codec, compared case-insensitively.
pub const OPUS_CODEC_NAME: &str = "opus";

/// Configures the send codec of `channel` according to `spec`.
///
/// Returns the first fatal failure. A rejected CN payload registration is
/// logged and tolerated: it happens when the same remote description is
/// applied twice while the channel is already sending.
pub fn configure_send_codec(channel: &dyn Channel, spec: &SendCodecSpec) -> Result<()> {
    let channel_id = channel.id();

    // Disable VAD and FEC unless we know the other side wants them.
    if let Err(err) = channel.set_vad_status(false) {
        warn!("set_vad_status({channel_id}, false) failed, err={err}");
    }
    if let Err(err) = channel.set_codec_fec_status(false) {
        warn!("set_codec_fec_status({channel_id}, false) failed, err={err}");
    }

    let codec = &spec.codec_inst;
    info!(
        "Send channel {channel_id} selected voice codec {codec}, bitrate={}",
        codec.rate
    );

    if channel.send_codec().as_ref() != Some(codec) {
        channel.set_send_codec(codec).map_err(|err| {
            warn!("set_send_codec({channel_id}, {codec}) failed, err={err}");
            Error::ErrSetSendCodec {
                codec: codec.to_string(),
                source: Box::new(err),
            }
        })?;
    }

    if spec.enable_codec_fec {
        info!("Attempt to enable codec internal FEC on channel {channel_id}");
        channel.set_codec_fec_status(true).map_err(|err| {
            warn!("set_codec_fec_status({channel_id}, true) failed, err={err}");
            Error::ErrEnableCodecFec(Box::new(err))
        })?;
    }

    if codec.is_codec(OPUS_CODEC_NAME) {
        let enable = spec.enable_opus_dtx;
        info!(
            "Attempt to {} Opus DTX on channel {channel_id}",
            if enable { "enable" } else { "disable" }
        );
        channel.set_opus_dtx(enable).map_err(|err| {
            warn!("set_opus_dtx({channel_id}, {enable}) failed, err={err}");
            Error::ErrSetOpusDtx {
                enable,
                source: Box::new(err),
            }
        })?;

        let rate = spec.opus_max_playback_rate;
        if rate > 0 {
            info!("Attempt to set maximum playback rate to {rate} Hz on channel {channel_id}");
            channel.set_opus_max_playback_rate(rate).map_err(|err| {
                warn!("set_opus_max_playback_rate({channel_id}, {rate}) failed, err={err}");
                Error::ErrSetOpusMaxPlaybackRate {
                    rate,
                    source: Box::new(err),
                }
            })?;
        }
    }

    if let Some(cng_payload_type) = spec.cng_payload_type {
        if spec.cng_plfreq != DEFAULT_CN_FREQUENCY_HZ {
            let frequency = CnFrequency::try_from(spec.cng_plfreq)?;
            if let Err(err) = channel.set_send_cn_payload_type(cng_payload_type, frequency) {
                warn!(
                    "set_send_cn_payload_type({channel_id}, {cng_payload_type}, {frequency}) failed, err={err}"
                );
            }
        }

        // VAD only makes sense when CN runs at the codec's clock rate, and
        // only works for mono.
        if spec.cng_plfreq == codec.plfreq && codec.channels == 1 {
            info!("Enabling VAD");
            channel.set_vad_status(true).map_err(|err| {
                warn!("set_vad_status({channel_id}, true) failed, err={err}");
                Error::ErrEnableVad(Box::new(err))
            })?;
        }
    }

    Ok(())
}
