//! Recording fakes of the collaborators an `AudioSendStream` talks to.

#![allow(dead_code)]

use rtc_audio::audio_state::{AudioProcessing, AudioState, EchoDelayMetrics, EchoMetrics};
use rtc_audio::channel::{
    CallStatistics, Channel, CnFrequency, ReportBlock, RtcEventLog, Transport,
};
use rtc_audio::config::{AudioSendStreamConfigBuilder, CodecInst};
use rtc_audio::congestion::{
    BitrateAllocator, BitrateAllocatorObserver, CongestionControlObjects, CongestionController,
    MediaStreamAllocationConfig, PacedSender, PacketRouter, TransportFeedbackObserver,
};
use rtc_audio::{AudioSendStream, AudioSendStreamConfig, Error, Result, TaskQueue};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const WORKER_QUEUE_NAME: &str = "audio_worker_queue";
pub const CHANNEL_ID: i32 = 7;
pub const LOCAL_SSRC: u32 = 0x1234_5678;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn opus() -> CodecInst {
    CodecInst::new(111, "opus", 48000, 960, 2, 32000)
}

pub fn isac() -> CodecInst {
    CodecInst::new(103, "ISAC", 16000, 480, 1, 32000)
}

pub fn pcmu() -> CodecInst {
    CodecInst::new(0, "PCMU", 8000, 160, 1, 64000)
}

// =============================================================================
// Channel
// =============================================================================

/// Every call the stream made on the channel, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetRtcEventLog(bool),
    RegisterCongestionControlObjects,
    ResetCongestionControlObjects,
    SetRtcpStatus(bool),
    SetLocalSsrc(u32),
    SetRtcpCname(String),
    SetNackStatus(bool, u32),
    RegisterExternalTransport(bool),
    DeregisterExternalTransport,
    SetSendAbsoluteSenderTimeStatus(bool, u16),
    SetSendAudioLevelIndicationStatus(bool, u16),
    EnableSendTransportSequenceNumber(u16),
    StartSend,
    StopSend,
    SetSendCodec(CodecInst),
    SetVadStatus(bool),
    SetCodecFecStatus(bool),
    SetOpusDtx(bool),
    SetOpusMaxPlaybackRate(i32),
    SetSendCnPayloadType(u8, CnFrequency),
    SetSendTelephoneEventPayloadType(u8),
    SendTelephoneEventOutband(u8, u32),
    SetInputMute(bool),
    ReceivedRtcpPacket(Vec<u8>),
    SetBitrate(u32),
}

#[derive(Default)]
pub struct FakeChannel {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    send_codec: Mutex<Option<CodecInst>>,
    rtcp_statistics: Mutex<CallStatistics>,
    report_blocks: Mutex<Vec<ReportBlock>>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the named operation fail from now on.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub fn set_current_codec(&self, codec: Option<CodecInst>) {
        *self.send_codec.lock().unwrap() = codec;
    }

    pub fn set_rtcp_statistics(&self, stats: CallStatistics) {
        *self.rtcp_statistics.lock().unwrap() = stats;
    }

    pub fn set_report_blocks(&self, blocks: Vec<ReportBlock>) {
        *self.report_blocks.lock().unwrap() = blocks;
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &'static str) -> Result<()> {
        if self.failing.lock().unwrap().contains(op) {
            Err(Error::ErrChannel(-1))
        } else {
            Ok(())
        }
    }
}

impl Channel for FakeChannel {
    fn id(&self) -> i32 {
        CHANNEL_ID
    }

    fn set_rtc_event_log(&self, event_log: Option<Arc<dyn RtcEventLog>>) {
        self.record(Call::SetRtcEventLog(event_log.is_some()));
    }

    fn register_sender_congestion_control_objects(&self, _objects: &CongestionControlObjects) {
        self.record(Call::RegisterCongestionControlObjects);
    }

    fn reset_congestion_control_objects(&self) {
        self.record(Call::ResetCongestionControlObjects);
    }

    fn set_rtcp_status(&self, enable: bool) {
        self.record(Call::SetRtcpStatus(enable));
    }

    fn set_local_ssrc(&self, ssrc: u32) {
        self.record(Call::SetLocalSsrc(ssrc));
    }

    fn set_rtcp_cname(&self, c_name: &str) {
        self.record(Call::SetRtcpCname(c_name.to_owned()));
    }

    fn set_nack_status(&self, enable: bool, max_packets: u32) {
        self.record(Call::SetNackStatus(enable, max_packets));
    }

    fn register_external_transport(&self, transport: Option<Arc<dyn Transport>>) {
        self.record(Call::RegisterExternalTransport(transport.is_some()));
    }

    fn deregister_external_transport(&self) {
        self.record(Call::DeregisterExternalTransport);
    }

    fn set_send_absolute_sender_time_status(&self, enable: bool, id: u16) {
        self.record(Call::SetSendAbsoluteSenderTimeStatus(enable, id));
    }

    fn set_send_audio_level_indication_status(&self, enable: bool, id: u16) {
        self.record(Call::SetSendAudioLevelIndicationStatus(enable, id));
    }

    fn enable_send_transport_sequence_number(&self, id: u16) {
        self.record(Call::EnableSendTransportSequenceNumber(id));
    }

    fn start_send(&self) -> Result<()> {
        self.record(Call::StartSend);
        self.check("start_send")
    }

    fn stop_send(&self) -> Result<()> {
        self.record(Call::StopSend);
        self.check("stop_send")
    }

    fn send_codec(&self) -> Option<CodecInst> {
        self.send_codec.lock().unwrap().clone()
    }

    fn set_send_codec(&self, codec: &CodecInst) -> Result<()> {
        self.record(Call::SetSendCodec(codec.clone()));
        self.check("set_send_codec")?;
        *self.send_codec.lock().unwrap() = Some(codec.clone());
        Ok(())
    }

    fn set_vad_status(&self, enable: bool) -> Result<()> {
        self.record(Call::SetVadStatus(enable));
        if enable {
            self.check("enable_vad")
        } else {
            Ok(())
        }
    }

    fn set_codec_fec_status(&self, enable: bool) -> Result<()> {
        self.record(Call::SetCodecFecStatus(enable));
        if enable {
            self.check("enable_codec_fec")
        } else {
            Ok(())
        }
    }

    fn set_opus_dtx(&self, enable: bool) -> Result<()> {
        self.record(Call::SetOpusDtx(enable));
        self.check("set_opus_dtx")
    }

    fn set_opus_max_playback_rate(&self, frequency_hz: i32) -> Result<()> {
        self.record(Call::SetOpusMaxPlaybackRate(frequency_hz));
        self.check("set_opus_max_playback_rate")
    }

    fn set_send_cn_payload_type(&self, payload_type: u8, frequency: CnFrequency) -> Result<()> {
        self.record(Call::SetSendCnPayloadType(payload_type, frequency));
        self.check("set_send_cn_payload_type")
    }

    fn set_send_telephone_event_payload_type(&self, payload_type: u8) -> bool {
        self.record(Call::SetSendTelephoneEventPayloadType(payload_type));
        self.check("set_send_telephone_event_payload_type").is_ok()
    }

    fn send_telephone_event_outband(&self, event: u8, duration_ms: u32) -> bool {
        self.record(Call::SendTelephoneEventOutband(event, duration_ms));
        self.check("send_telephone_event_outband").is_ok()
    }

    fn set_input_mute(&self, muted: bool) {
        self.record(Call::SetInputMute(muted));
    }

    fn rtcp_statistics(&self) -> Result<CallStatistics> {
        self.check("rtcp_statistics")?;
        Ok(*self.rtcp_statistics.lock().unwrap())
    }

    fn remote_rtcp_report_blocks(&self) -> Vec<ReportBlock> {
        self.report_blocks.lock().unwrap().clone()
    }

    fn received_rtcp_packet(&self, packet: &[u8]) -> bool {
        self.record(Call::ReceivedRtcpPacket(packet.to_vec()));
        self.check("received_rtcp_packet").is_ok()
    }

    fn set_bitrate(&self, bitrate_bps: u32) {
        self.record(Call::SetBitrate(bitrate_bps));
    }
}

// =============================================================================
// Bitrate allocator
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AllocatorEvent {
    AddObserver(MediaStreamAllocationConfig),
    RemoveObserver { was_registered: bool },
}

/// Records (de)registrations together with the name of the calling thread.
#[derive(Default)]
pub struct FakeBitrateAllocator {
    events: Mutex<Vec<(AllocatorEvent, Option<String>)>>,
    observers: Mutex<Vec<Arc<dyn BitrateAllocatorObserver>>>,
}

impl FakeBitrateAllocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<AllocatorEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub fn threads(&self) -> Vec<Option<String>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, thread)| thread.clone())
            .collect()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    /// Hands `bitrate_bps` to every registered observer, returns their protection bitrates.
    pub fn allocate(&self, bitrate_bps: u32) -> Vec<u32> {
        let observers = self.observers.lock().unwrap().clone();
        observers
            .iter()
            .map(|o| o.on_bitrate_updated(bitrate_bps, 0, 50))
            .collect()
    }

    fn record(&self, event: AllocatorEvent) {
        let thread = std::thread::current().name().map(str::to_owned);
        self.events.lock().unwrap().push((event, thread));
    }
}

impl BitrateAllocator for FakeBitrateAllocator {
    fn add_observer(
        &self,
        observer: Arc<dyn BitrateAllocatorObserver>,
        config: MediaStreamAllocationConfig,
    ) {
        self.record(AllocatorEvent::AddObserver(config));
        self.observers.lock().unwrap().push(observer);
    }

    fn remove_observer(&self, observer: &Arc<dyn BitrateAllocatorObserver>) {
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        let was_registered = observers.len() != before;
        drop(observers);
        self.record(AllocatorEvent::RemoveObserver { was_registered });
    }
}

// =============================================================================
// Audio state
// =============================================================================

pub struct FakeAudioProcessing {
    pub speech_level: Mutex<Result<u32>>,
    pub ec_metrics_enabled: Mutex<Result<bool>>,
    pub delay_metrics: Mutex<Result<EchoDelayMetrics>>,
    pub echo_metrics: Mutex<Result<EchoMetrics>>,
}

impl Default for FakeAudioProcessing {
    fn default() -> Self {
        Self {
            speech_level: Mutex::new(Ok(0)),
            ec_metrics_enabled: Mutex::new(Ok(false)),
            delay_metrics: Mutex::new(Ok(EchoDelayMetrics::default())),
            echo_metrics: Mutex::new(Ok(EchoMetrics::default())),
        }
    }
}

fn clone_result<T: Clone>(result: &Result<T>) -> Result<T> {
    match result {
        Ok(v) => Ok(v.clone()),
        Err(_) => Err(Error::ErrChannel(-1)),
    }
}

impl AudioProcessing for FakeAudioProcessing {
    fn speech_input_level_full_range(&self) -> Result<u32> {
        clone_result(&self.speech_level.lock().unwrap())
    }

    fn ec_metrics_enabled(&self) -> Result<bool> {
        clone_result(&self.ec_metrics_enabled.lock().unwrap())
    }

    fn ec_delay_metrics(&self) -> Result<EchoDelayMetrics> {
        clone_result(&self.delay_metrics.lock().unwrap())
    }

    fn echo_metrics(&self) -> Result<EchoMetrics> {
        clone_result(&self.echo_metrics.lock().unwrap())
    }
}

#[derive(Default)]
pub struct FakeAudioState {
    pub typing_noise: AtomicBool,
    pub processing: Arc<FakeAudioProcessing>,
}

impl FakeAudioState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_typing_noise(&self, detected: bool) {
        self.typing_noise.store(detected, Ordering::SeqCst);
    }
}

impl AudioState for FakeAudioState {
    fn typing_noise_detected(&self) -> bool {
        self.typing_noise.load(Ordering::SeqCst)
    }

    fn audio_processing(&self) -> Arc<dyn AudioProcessing> {
        Arc::clone(&self.processing) as Arc<dyn AudioProcessing>
    }
}

// =============================================================================
// Congestion controller, transport, event log
// =============================================================================

struct Opaque;
impl PacedSender for Opaque {}
impl TransportFeedbackObserver for Opaque {}
impl PacketRouter for Opaque {}
impl RtcEventLog for Opaque {}

pub struct FakeCongestionController;

impl CongestionController for FakeCongestionController {
    fn pacer(&self) -> Arc<dyn PacedSender> {
        Arc::new(Opaque)
    }

    fn transport_feedback_observer(&self) -> Arc<dyn TransportFeedbackObserver> {
        Arc::new(Opaque)
    }

    fn packet_router(&self) -> Arc<dyn PacketRouter> {
        Arc::new(Opaque)
    }
}

pub fn event_log() -> Arc<dyn RtcEventLog> {
    Arc::new(Opaque)
}

pub struct NullTransport;

impl Transport for NullTransport {
    fn send_rtp(&self, _packet: &[u8]) -> bool {
        true
    }

    fn send_rtcp(&self, _packet: &[u8]) -> bool {
        true
    }
}

// =============================================================================
// Stream fixture
// =============================================================================

/// A stream together with the fakes behind it.
pub struct Fixture {
    pub channel: Arc<FakeChannel>,
    pub allocator: Arc<FakeBitrateAllocator>,
    pub audio_state: Arc<FakeAudioState>,
    pub worker_queue: Arc<TaskQueue>,
}

impl Fixture {
    pub fn new() -> Self {
        init_logger();
        Self {
            channel: FakeChannel::new(),
            allocator: FakeBitrateAllocator::new(),
            audio_state: FakeAudioState::new(),
            worker_queue: Arc::new(TaskQueue::new(WORKER_QUEUE_NAME).unwrap()),
        }
    }

    pub fn config_builder(&self) -> AudioSendStreamConfigBuilder {
        AudioSendStreamConfigBuilder::new(Arc::clone(&self.channel) as Arc<dyn Channel>)
            .with_ssrc(LOCAL_SSRC)
            .with_c_name("fake@cname")
    }

    pub fn create_stream(&self, config: AudioSendStreamConfig) -> Result<AudioSendStream> {
        AudioSendStream::new(
            config,
            Arc::clone(&self.audio_state) as Arc<dyn AudioState>,
            Arc::clone(&self.worker_queue),
            &FakeCongestionController,
            Arc::clone(&self.allocator) as Arc<dyn BitrateAllocator>,
            Some(event_log()),
        )
    }
}
