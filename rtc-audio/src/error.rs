use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("channel: operation failed with error {0}")]
    ErrChannel(i32),

    // Send codec setup
    #[error("codec: failed to set send codec {codec}: {source}")]
    ErrSetSendCodec { codec: String, source: Box<Error> },
    #[error("codec: failed to enable codec internal FEC: {0}")]
    ErrEnableCodecFec(Box<Error>),
    #[error("codec: failed to set opus DTX to {enable}: {source}")]
    ErrSetOpusDtx { enable: bool, source: Box<Error> },
    #[error("codec: failed to set opus max playback rate to {rate} Hz: {source}")]
    ErrSetOpusMaxPlaybackRate { rate: i32, source: Box<Error> },
    #[error("codec: failed to enable VAD: {0}")]
    ErrEnableVad(Box<Error>),

    // Configuration contract
    #[error("config: unsupported CN clock rate {0} Hz")]
    ErrUnsupportedCnFrequency(u32),
    #[error("config: unsupported RTP header extension {0}")]
    ErrUnsupportedRtpExtension(String),
    #[error("config: max bitrate {max} bps is lower than min bitrate {min} bps")]
    ErrInvalidBitrateRange { min: u32, max: u32 },
    #[error("config: min and max bitrate must both be set or both be unset")]
    ErrIncompleteBitrateRange,

    // Worker queue
    #[error("task queue: closed")]
    ErrTaskQueueClosed,
    #[error("task queue: task did not complete within {0:?}")]
    ErrTaskQueueTimeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}
