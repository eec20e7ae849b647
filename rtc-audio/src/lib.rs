//! RTC Audio - outbound audio stream control for WebRTC calls.
//!
//! This crate drives a single outbound audio stream on top of an audio
//! channel provided by a voice engine. It does not encode audio, build RTP or
//! RTCP packets, or estimate bandwidth; those live behind the capability
//! traits in [`channel`], [`congestion`] and [`audio_state`]. What it does:
//!
//! | Part | Description |
//! |------|-------------|
//! | [`AudioSendStream`] | Owns the stream configuration, wires the channel up on construction and releases it on drop, starts and stops sending |
//! | [`configure_send_codec`] | Applies codec, FEC, Opus DTX / max playback rate, comfort noise and VAD settings in the order the channel requires |
//! | bitrate adaptation | Registers the stream with the call's [`BitrateAllocator`] while started and clamps allocations to the configured max |
//! | [`AudioSendStreamStats`] | Merges RTCP counters, the remote report block for the stream, and audio processing metrics |
//!
//! # Threading
//!
//! A stream belongs to the thread that created it. Bitrate allocator
//! (de)registration runs on a shared [`TaskQueue`]; [`AudioSendStream::start`]
//! and [`AudioSendStream::stop`] block until the worker has done it.
//! [`AudioSendStream::deliver_rtcp`] is the one entry point that may be
//! called from the network thread.
//!
//! # Quick Start
//!
//! ```ignore
//! use rtc_audio::config::{AudioSendStreamConfigBuilder, CodecInst, SendCodecSpec, TRANSPORT_CC_URI};
//! use rtc_audio::{AudioSendStream, TaskQueue};
//! use std::sync::Arc;
//!
//! let config = AudioSendStreamConfigBuilder::new(channel)
//!     .with_ssrc(0x1234_5678)
//!     .with_c_name("alice")
//!     .with_extension(TRANSPORT_CC_URI, 5)
//!     .with_send_codec_spec(SendCodecSpec {
//!         codec_inst: CodecInst::new(111, "opus", 48000, 960, 2, 32000),
//!         enable_codec_fec: true,
//!         ..Default::default()
//!     })
//!     .with_bitrate_range(16000, 64000)
//!     .build()?;
//!
//! let worker_queue = Arc::new(TaskQueue::new("worker_queue")?);
//! let mut stream = AudioSendStream::new(
//!     config,
//!     audio_state,
//!     worker_queue,
//!     congestion_controller.as_ref(),
//!     bitrate_allocator,
//!     None,
//! )?;
//!
//! stream.start();
//! println!("{:?}", stream.get_stats());
//! stream.stop();
//! ```

#![warn(rust_2018_idioms)]

pub mod audio_state;
pub mod channel;
pub mod config;
pub mod congestion;
pub mod error;
pub mod send_stream;
pub mod task_queue;

mod thread_checker;

pub use audio_state::{AudioProcessing, AudioState};
pub use channel::{Channel, Transport};
pub use config::{AudioSendStreamConfig, AudioSendStreamConfigBuilder};
pub use congestion::{BitrateAllocator, BitrateAllocatorObserver, CongestionController};
pub use error::{Error, Result};
pub use send_stream::codec::configure_send_codec;
pub use send_stream::stats::{AudioSendStreamStats, EchoStats};
pub use send_stream::{AudioSendStream, NetworkState};
pub use task_queue::TaskQueue;
