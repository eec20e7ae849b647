//! Congestion control and bitrate allocation seams.
//!
//! The pacer, the transport feedback observer and the packet router belong to
//! the call-wide congestion controller. A send stream never looks inside them;
//! it only hands them to its channel on construction and takes them back on
//! destruction. The bitrate allocator is shared by every stream of a call and
//! is only ever touched from the worker queue.

use std::fmt;
use std::sync::Arc;

/// Paces outgoing packets onto the network.
pub trait PacedSender: Send + Sync {}

/// Receives transport-wide feedback for sent packets.
pub trait TransportFeedbackObserver: Send + Sync {}

/// Routes RTP packets from the pacer to the right RTP module.
pub trait PacketRouter: Send + Sync {}

/// Call-wide congestion controller owning the objects a sending channel registers with.
pub trait CongestionController: Send + Sync {
    fn pacer(&self) -> Arc<dyn PacedSender>;
    fn transport_feedback_observer(&self) -> Arc<dyn TransportFeedbackObserver>;
    fn packet_router(&self) -> Arc<dyn PacketRouter>;
}

/// The congestion control objects a channel needs while sending.
#[derive(Clone)]
pub struct CongestionControlObjects {
    pub pacer: Arc<dyn PacedSender>,
    pub transport_feedback_observer: Arc<dyn TransportFeedbackObserver>,
    pub packet_router: Arc<dyn PacketRouter>,
}

impl CongestionControlObjects {
    pub fn from_controller(controller: &dyn CongestionController) -> Self {
        Self {
            pacer: controller.pacer(),
            transport_feedback_observer: controller.transport_feedback_observer(),
            packet_router: controller.packet_router(),
        }
    }
}

impl fmt::Debug for CongestionControlObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CongestionControlObjects").finish_non_exhaustive()
    }
}

/// Parameters a stream registers with the bitrate allocator.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct MediaStreamAllocationConfig {
    pub min_bitrate_bps: u32,
    pub max_bitrate_bps: u32,
    /// Bitrate the allocator should pad up to when the stream is active
    pub pad_up_bitrate_bps: u32,
    /// Keep allocating `min_bitrate_bps` even when the estimate drops below it
    pub enforce_min_bitrate: bool,
}

/// Receives bitrate allocations from the [`BitrateAllocator`].
pub trait BitrateAllocatorObserver: Send + Sync {
    /// Applies a new allocation and returns the bitrate spent on protection, in bps.
    ///
    /// `fraction_loss` is Q8 fixed point, `rtt_ms` the current round trip time.
    fn on_bitrate_updated(&self, bitrate_bps: u32, fraction_loss: u8, rtt_ms: i64) -> u32;
}

/// Distributes the estimated network bitrate across the streams of a call.
///
/// Observers are identified by their `Arc`. Removing an observer that was
/// never added must be a no-op.
pub trait BitrateAllocator: Send + Sync {
    fn add_observer(
        &self,
        observer: Arc<dyn BitrateAllocatorObserver>,
        config: MediaStreamAllocationConfig,
    );
    fn remove_observer(&self, observer: &Arc<dyn BitrateAllocatorObserver>);
}
