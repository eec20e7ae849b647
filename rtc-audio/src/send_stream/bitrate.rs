use std::sync::Arc;

use crate::channel::Channel;
use crate::congestion::BitrateAllocatorObserver;

/// Bridges bitrate allocator callbacks into channel bitrate updates.
///
/// Registered with the allocator while the stream is started; the allocator
/// calls it from the worker queue.
pub(crate) struct BitrateAdapter {
    channel: Arc<dyn Channel>,
    min_bitrate_bps: Option<u32>,
    max_bitrate_bps: Option<u32>,
}

impl BitrateAdapter {
    pub(crate) fn new(
        channel: Arc<dyn Channel>,
        min_bitrate_bps: Option<u32>,
        max_bitrate_bps: Option<u32>,
    ) -> Self {
        Self {
            channel,
            min_bitrate_bps,
            max_bitrate_bps,
        }
    }
}

impl BitrateAllocatorObserver for BitrateAdapter {
    fn on_bitrate_updated(&self, bitrate_bps: u32, _fraction_loss: u8, _rtt_ms: i64) -> u32 {
        debug_assert!(
            bitrate_bps >= self.min_bitrate_bps.unwrap_or(0),
            "allocated {bitrate_bps} bps below configured min"
        );

        // The allocator may hand out more than the configured max when there
        // is room, e.g. for extra FEC. That headroom is dropped here.
        let bitrate_bps = match self.max_bitrate_bps {
            Some(max_bitrate_bps) => bitrate_bps.min(max_bitrate_bps),
            None => bitrate_bps,
        };

        self.channel.set_bitrate(bitrate_bps);

        // The encoder does not expose how much of the rate goes to protection.
        0
    }
}
