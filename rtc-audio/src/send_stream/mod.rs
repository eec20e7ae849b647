//! Outbound audio stream.

pub mod codec;
pub mod stats;

mod bitrate;

use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};

use crate::audio_state::AudioState;
use crate::channel::RtcEventLog;
use crate::config::{AudioSendStreamConfig, RtpExtensionKind};
use crate::congestion::{
    BitrateAllocator, BitrateAllocatorObserver, CongestionControlObjects, CongestionController,
    MediaStreamAllocationConfig,
};
use crate::error::{Error, Result};
use crate::task_queue::TaskQueue;
use crate::thread_checker::ThreadChecker;
use bitrate::BitrateAdapter;
use codec::configure_send_codec;
use stats::AudioSendStreamStats;

/// Network availability as signalled by the call.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum NetworkState {
    #[default]
    Up,
    Down,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            NetworkState::Up => "up",
            NetworkState::Down => "down",
        };
        write!(f, "{s}")
    }
}

/// A single outbound audio stream on top of an audio channel.
///
/// The stream configures its channel on construction and hands the channel
/// back on drop. In between it toggles sending, takes part in bitrate
/// allocation while started and reports statistics.
///
/// All methods except [`deliver_rtcp`](Self::deliver_rtcp) must be called on
/// the thread that created the stream. `deliver_rtcp` may be called from the
/// network thread concurrently.
///
/// # Example
///
/// ```ignore
/// use rtc_audio::{AudioSendStream, TaskQueue};
///
/// let worker_queue = Arc::new(TaskQueue::new("worker")?);
/// let mut stream = AudioSendStream::new(
///     config,
///     audio_state,
///     worker_queue,
///     congestion_controller.as_ref(),
///     bitrate_allocator,
///     None,
/// )?;
///
/// stream.start();
/// let stats = stream.get_stats();
/// stream.stop();
/// ```
pub struct AudioSendStream {
    config: AudioSendStreamConfig,
    audio_state: Arc<dyn AudioState>,
    worker_queue: Arc<TaskQueue>,
    bitrate_allocator: Arc<dyn BitrateAllocator>,
    bitrate_observer: Arc<dyn BitrateAllocatorObserver>,
    bitrate_registered: bool,
    send_codec_configured: bool,
    thread_checker: ThreadChecker,
}

impl AudioSendStream {
    /// Creates the stream and configures its channel.
    ///
    /// Fails only when `config` is invalid, before the channel is touched. A
    /// channel rejecting the send codec setup is logged and leaves the stream
    /// usable with whatever codec state the channel ended up in, see
    /// [`is_send_codec_configured`](Self::is_send_codec_configured).
    pub fn new(
        config: AudioSendStreamConfig,
        audio_state: Arc<dyn AudioState>,
        worker_queue: Arc<TaskQueue>,
        congestion_controller: &dyn CongestionController,
        bitrate_allocator: Arc<dyn BitrateAllocator>,
        event_log: Option<Arc<dyn RtcEventLog>>,
    ) -> Result<Self> {
        info!("AudioSendStream: {config}");
        config.validate()?;

        let channel = &config.channel;
        channel.set_rtc_event_log(event_log);
        channel.register_sender_congestion_control_objects(
            &CongestionControlObjects::from_controller(congestion_controller),
        );
        channel.set_rtcp_status(true);
        channel.set_local_ssrc(config.rtp.ssrc);
        channel.set_rtcp_cname(&config.rtp.c_name);
        // TODO: derive the NACK history size from the packet size of the
        // configured codec instead of assuming 20 ms packets.
        channel.set_nack_status(config.rtp.nack.enabled(), config.rtp.nack.max_packets());

        channel.register_external_transport(config.send_transport.clone());

        for extension in &config.rtp.extensions {
            match extension.kind() {
                Some(RtpExtensionKind::AbsSendTime) => {
                    channel.set_send_absolute_sender_time_status(true, extension.id)
                }
                Some(RtpExtensionKind::AudioLevel) => {
                    channel.set_send_audio_level_indication_status(true, extension.id)
                }
                Some(RtpExtensionKind::TransportSequenceNumber) => {
                    channel.enable_send_transport_sequence_number(extension.id)
                }
                None => {
                    return Err(Error::ErrUnsupportedRtpExtension(extension.uri.clone()));
                }
            }
        }

        let send_codec_configured =
            match configure_send_codec(channel.as_ref(), &config.send_codec_spec) {
                Ok(()) => true,
                Err(err) => {
                    error!("Failed to set up send codec state: {err}");
                    false
                }
            };

        let bitrate_observer: Arc<dyn BitrateAllocatorObserver> = Arc::new(BitrateAdapter::new(
            Arc::clone(channel),
            config.min_bitrate_bps,
            config.max_bitrate_bps,
        ));

        Ok(Self {
            config,
            audio_state,
            worker_queue,
            bitrate_allocator,
            bitrate_observer,
            bitrate_registered: false,
            send_codec_configured,
            thread_checker: ThreadChecker::new(),
        })
    }

    /// Registers with the bitrate allocator, if adaptation is enabled, then starts sending.
    ///
    /// Blocks until the worker queue has run the registration, or until the
    /// configured registration timeout elapses.
    pub fn start(&mut self) {
        debug_assert!(self.thread_checker.called_on_valid_thread());

        if let Some((min_bitrate_bps, max_bitrate_bps)) = self.config.bitrate_range() {
            debug_assert!(max_bitrate_bps >= min_bitrate_bps);
            let allocation = MediaStreamAllocationConfig {
                min_bitrate_bps,
                max_bitrate_bps,
                pad_up_bitrate_bps: 0,
                enforce_min_bitrate: true,
            };
            let allocator = Arc::clone(&self.bitrate_allocator);
            let observer = Arc::clone(&self.bitrate_observer);
            match self.worker_queue.post_and_wait(
                move || allocator.add_observer(observer, allocation),
                self.config.registration_timeout,
            ) {
                Ok(()) => self.bitrate_registered = true,
                Err(Error::ErrTaskQueueTimeout(timeout)) => {
                    // The task is still queued and will register later.
                    warn!(
                        "AudioSendStream::start: bitrate allocator registration still pending after {timeout:?}"
                    );
                    self.bitrate_registered = true;
                }
                Err(err) => {
                    error!("AudioSendStream::start: bitrate allocator registration failed: {err}")
                }
            }
        }

        if let Err(err) = self.config.channel.start_send() {
            error!("AudioSendStream::start failed with error: {err}");
        }
    }

    /// Leaves bitrate allocation and stops sending.
    ///
    /// Deregistration is always attempted, the allocator ignores observers it
    /// does not know.
    pub fn stop(&mut self) {
        debug_assert!(self.thread_checker.called_on_valid_thread());

        self.remove_bitrate_observer();

        if let Err(err) = self.config.channel.stop_send() {
            error!("AudioSendStream::stop failed with error: {err}");
        }
    }

    /// Sends a DTMF event out of band. Returns `true` only if the payload type
    /// was accepted and the event was sent.
    pub fn send_telephone_event(&self, payload_type: u8, event: u8, duration_ms: u32) -> bool {
        debug_assert!(self.thread_checker.called_on_valid_thread());
        let channel = &self.config.channel;
        channel.set_send_telephone_event_payload_type(payload_type)
            && channel.send_telephone_event_outband(event, duration_ms)
    }

    pub fn set_muted(&self, muted: bool) {
        debug_assert!(self.thread_checker.called_on_valid_thread());
        self.config.channel.set_input_mute(muted);
    }

    /// Collects a fresh statistics snapshot.
    pub fn get_stats(&self) -> AudioSendStreamStats {
        debug_assert!(self.thread_checker.called_on_valid_thread());
        stats::collect(
            self.config.rtp.ssrc,
            self.config.channel.as_ref(),
            self.audio_state.as_ref(),
        )
    }

    /// Audio sending does not react to network state changes.
    pub fn signal_network_state(&self, _state: NetworkState) {
        debug_assert!(self.thread_checker.called_on_valid_thread());
    }

    /// Hands a received RTCP packet to the channel.
    ///
    /// Safe to call from any thread.
    pub fn deliver_rtcp(&self, packet: &[u8]) -> bool {
        self.config.channel.received_rtcp_packet(packet)
    }

    /// Applies a bitrate allocation, see [`BitrateAllocatorObserver::on_bitrate_updated`].
    pub fn on_bitrate_updated(&self, bitrate_bps: u32, fraction_loss: u8, rtt_ms: i64) -> u32 {
        self.bitrate_observer
            .on_bitrate_updated(bitrate_bps, fraction_loss, rtt_ms)
    }

    pub fn config(&self) -> &AudioSendStreamConfig {
        debug_assert!(self.thread_checker.called_on_valid_thread());
        &self.config
    }

    /// Whether the send codec setup at construction fully succeeded.
    pub fn is_send_codec_configured(&self) -> bool {
        self.send_codec_configured
    }

    fn remove_bitrate_observer(&mut self) {
        let allocator = Arc::clone(&self.bitrate_allocator);
        let observer = Arc::clone(&self.bitrate_observer);
        if let Err(err) = self.worker_queue.post_and_wait(
            move || allocator.remove_observer(&observer),
            self.config.registration_timeout,
        ) {
            error!("AudioSendStream::stop: bitrate allocator deregistration failed: {err}");
        }
        self.bitrate_registered = false;
    }
}

impl Drop for AudioSendStream {
    fn drop(&mut self) {
        debug_assert!(self.thread_checker.called_on_valid_thread());
        info!("~AudioSendStream: {}", self.config);

        if self.bitrate_registered {
            warn!(
                "AudioSendStream for ssrc {} dropped while started",
                self.config.rtp.ssrc
            );
            self.remove_bitrate_observer();
        }

        let channel = &self.config.channel;
        channel.deregister_external_transport();
        channel.reset_congestion_control_objects();
        channel.set_rtc_event_log(None);
    }
}
