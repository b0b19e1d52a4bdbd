// 测试用的内存后端：脚本化的容器 / 解码器 + 记录帧的显示表面

use crate::core::{
    MediaType, PixelFormat, Plane, PlayerError, Rational, RawFrame, Result, StreamDescriptor,
    VideoFrame,
};
use crate::player::backend::{
    ContainerHandle, DecodeStatus, MediaBackend, MediaPacket, VideoDecoding,
};
use crate::renderer::PresentSurface;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub fn video_stream(index: usize, codec: &str) -> StreamDescriptor {
    StreamDescriptor {
        index,
        media_type: MediaType::Video,
        codec: codec.to_string(),
        time_base: Rational::new(1, 90000),
        frame_rate: Rational::new(100, 1),
        start_time: 0,
        duration: 90000,
        width: Some(4),
        height: Some(4),
        channels: None,
        sample_rate: None,
    }
}

pub fn audio_stream(index: usize) -> StreamDescriptor {
    StreamDescriptor {
        index,
        media_type: MediaType::Audio,
        codec: "aac".to_string(),
        time_base: Rational::new(1, 44100),
        frame_rate: Rational::default(),
        start_time: 0,
        duration: 44100,
        width: None,
        height: None,
        channels: Some(2),
        sample_rate: Some(44100),
    }
}

/// 资源计数：验证每个容器 / 解码器恰好释放一次
#[derive(Debug, Default)]
pub struct Counters {
    containers_opened: AtomicUsize,
    containers_dropped: AtomicUsize,
    decoders_opened: AtomicUsize,
    decoders_dropped: AtomicUsize,
}

impl Counters {
    pub fn containers_opened(&self) -> usize {
        self.containers_opened.load(Ordering::SeqCst)
    }

    pub fn containers_dropped(&self) -> usize {
        self.containers_dropped.load(Ordering::SeqCst)
    }

    pub fn decoders_opened(&self) -> usize {
        self.decoders_opened.load(Ordering::SeqCst)
    }

    pub fn decoders_dropped(&self) -> usize {
        self.decoders_dropped.load(Ordering::SeqCst)
    }
}

/// 脚本化的数据包
#[derive(Debug, Clone)]
pub struct MockPacket {
    pub stream_index: usize,
    pub seq: i64,
    /// 解码器拒绝该包
    pub reject: bool,
    /// 该包解出的帧数
    pub frames: usize,
    pub format: PixelFormat,
    /// 该包之后第一次 receive 返回错误
    pub receive_error: bool,
}

impl MockPacket {
    pub fn video(stream_index: usize, seq: i64) -> Self {
        Self {
            stream_index,
            seq,
            reject: false,
            frames: 1,
            format: PixelFormat::YUV420P,
            receive_error: false,
        }
    }

    pub fn rejected(mut self) -> Self {
        self.reject = true;
        self
    }

    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_receive_error(mut self) -> Self {
        self.receive_error = true;
        self
    }
}

impl MediaPacket for MockPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }
}

pub struct MockContainer {
    streams: Vec<StreamDescriptor>,
    packets: VecDeque<MockPacket>,
    fail_probe: bool,
    counters: Arc<Counters>,
}

impl MockContainer {
    pub fn new(backend: &MockBackend, streams: Vec<StreamDescriptor>, packets: Vec<MockPacket>) -> Self {
        backend.counters.containers_opened.fetch_add(1, Ordering::SeqCst);
        Self {
            streams,
            packets: packets.into(),
            fail_probe: false,
            counters: backend.counters.clone(),
        }
    }
}

impl Drop for MockContainer {
    fn drop(&mut self) {
        self.counters.containers_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl ContainerHandle for MockContainer {
    type Packet = MockPacket;

    fn probe(&mut self) -> Result<Vec<StreamDescriptor>> {
        if self.fail_probe {
            return Err(PlayerError::ProbeFailed("mock".to_string()));
        }
        Ok(self.streams.clone())
    }

    fn next_packet(&mut self) -> Result<Option<MockPacket>> {
        Ok(self.packets.pop_front())
    }
}

pub struct MockDecoder {
    pending: VecDeque<RawFrame>,
    eof_sent: bool,
    receive_error: bool,
    counters: Arc<Counters>,
}

impl Drop for MockDecoder {
    fn drop(&mut self) {
        self.counters.decoders_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// 4x4 的测试帧，pts 即包序号
pub fn mock_frame(seq: i64, format: PixelFormat) -> RawFrame {
    RawFrame {
        pts: Some(seq),
        width: 4,
        height: 4,
        format,
        planes: vec![
            Plane { data: vec![128; 16], stride: 4 },
            Plane { data: vec![128; 4], stride: 2 },
            Plane { data: vec![128; 4], stride: 2 },
        ],
    }
}

impl VideoDecoding for MockDecoder {
    type Packet = MockPacket;

    fn submit(&mut self, packet: &MockPacket) -> Result<()> {
        if packet.reject {
            return Err(PlayerError::DecodeSubmitFailed(format!("包 {} 被拒绝", packet.seq)));
        }
        for _ in 0..packet.frames {
            self.pending.push_back(mock_frame(packet.seq, packet.format.clone()));
        }
        self.receive_error = packet.receive_error;
        Ok(())
    }

    fn receive(&mut self) -> Result<DecodeStatus> {
        if self.receive_error {
            self.receive_error = false;
            return Err(PlayerError::DecodeReceiveFailed("mock".to_string()));
        }
        match self.pending.pop_front() {
            Some(frame) => Ok(DecodeStatus::Frame(frame)),
            None if self.eof_sent => Ok(DecodeStatus::EndOfStream),
            None => Ok(DecodeStatus::NeedsMoreInput),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.eof_sent = true;
        Ok(())
    }
}

/// 脚本化后端
#[derive(Default)]
pub struct MockBackend {
    decoders: HashSet<String>,
    failing: HashSet<String>,
    streams: Vec<StreamDescriptor>,
    packets: Vec<MockPacket>,
    fail_open: bool,
    fail_probe: bool,
    counters: Arc<Counters>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decoder(mut self, codec: &str) -> Self {
        self.decoders.insert(codec.to_string());
        self
    }

    pub fn with_failing_decoder(mut self, codec: &str) -> Self {
        self.failing.insert(codec.to_string());
        self
    }

    pub fn with_streams(mut self, streams: Vec<StreamDescriptor>) -> Self {
        self.streams = streams;
        self
    }

    pub fn with_packets(mut self, packets: Vec<MockPacket>) -> Self {
        self.packets = packets;
        self
    }

    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn with_probe_failure(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }
}

impl MediaBackend for MockBackend {
    type Packet = MockPacket;
    type Container = MockContainer;
    type Decoder = MockDecoder;
    type Template = String;

    fn open(&self, path: &Path) -> Result<MockContainer> {
        if self.fail_open {
            return Err(PlayerError::OpenFailed(path.display().to_string()));
        }
        let mut container = MockContainer::new(self, self.streams.clone(), self.packets.clone());
        container.fail_probe = self.fail_probe;
        Ok(container)
    }

    fn find_decoder(&self, _container: &MockContainer, stream: &StreamDescriptor) -> Option<String> {
        self.decoders.get(&stream.codec).cloned()
    }

    fn open_decoder(
        &self,
        _container: &MockContainer,
        template: String,
        stream: &StreamDescriptor,
    ) -> Result<MockDecoder> {
        if self.failing.contains(&template) {
            return Err(PlayerError::DecoderOpenFailed {
                stream: stream.index,
                reason: format!("{} 无法打开", template),
            });
        }
        self.counters.decoders_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockDecoder {
            pending: VecDeque::new(),
            eof_sent: false,
            receive_error: false,
            counters: self.counters.clone(),
        })
    }
}

/// 记录每次呈现的显示表面
#[derive(Default)]
pub struct RecordingSurface {
    presented: Mutex<Vec<(Option<i64>, Instant)>>,
    inits: Mutex<Vec<(u32, u32)>>,
    fail_init: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn presented_pts(&self) -> Vec<Option<i64>> {
        self.presented.lock().iter().map(|(pts, _)| *pts).collect()
    }

    pub fn presented_at(&self) -> Vec<Instant> {
        self.presented.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn count(&self) -> usize {
        self.presented.lock().len()
    }

    pub fn inits(&self) -> Vec<(u32, u32)> {
        self.inits.lock().clone()
    }
}

impl PresentSurface for RecordingSurface {
    fn init(&self, width: u32, height: u32) -> Result<()> {
        if self.fail_init {
            return Err(PlayerError::SurfaceError("mock".to_string()));
        }
        self.inits.lock().push((width, height));
        Ok(())
    }

    fn present(&self, frame: VideoFrame) {
        self.presented.lock().push((frame.pts, Instant::now()));
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
