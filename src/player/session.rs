use crate::core::{log_ctx, PlaybackEvent, PlayerConfig, PlayerError, Result, StreamReport};
use crate::player::backend::{ContainerHandle, MediaBackend};
use crate::player::convert::ColorConverter;
use crate::player::decode_loop::{DecodeStats, DecodeTask};
use crate::player::pacer::{FramePacer, PauseGate};
use crate::player::selector::select_video_stream;
use crate::player::snapshot::SnapshotWriter;
use crate::renderer::PresentSurface;
use crossbeam_channel::Sender;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// 控制线程与解码线程共享的会话状态
///
/// in_use 和暂停闸门各自有独立的锁，都不与容器锁竞争
#[derive(Debug, Default)]
pub struct SessionShared {
    in_use: Mutex<bool>,
    pub gate: PauseGate,
}

impl SessionShared {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_use(&self) -> bool {
        *self.in_use.lock()
    }

    pub fn set_in_use(&self, in_use: bool) {
        *self.in_use.lock() = in_use;
    }
}

/// 播放会话 - 同一时刻最多一个解码线程
pub struct PlaybackSession<B: MediaBackend> {
    backend: B,
    config: PlayerConfig,
    /// 容器句柄：加载时探测和解码线程读包都必须经过这把锁
    container: Arc<Mutex<Option<B::Container>>>,
    shared: Arc<SessionShared>,
    surface: Arc<dyn PresentSurface>,
    events: Option<Sender<PlaybackEvent>>,
    worker: Option<JoinHandle<DecodeStats>>,
    last_stats: Option<DecodeStats>,
}

impl<B: MediaBackend> PlaybackSession<B> {
    pub fn new(backend: B, config: PlayerConfig, surface: Arc<dyn PresentSurface>) -> Self {
        info!("{} 🎮 创建播放会话（显示表面: {}）", log_ctx(), surface.name());
        Self {
            backend,
            config,
            container: Arc::new(Mutex::new(None)),
            shared: Arc::new(SessionShared::new()),
            surface,
            events: None,
            worker: None,
            last_stats: None,
        }
    }

    /// 播放事件发送端（窗口据此更新状态栏）
    pub fn with_events(mut self, events: Sender<PlaybackEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn is_in_use(&self) -> bool {
        self.shared.is_in_use()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.gate.is_paused()
    }

    /// 上一次播放结束时的统计
    pub fn last_stats(&self) -> Option<DecodeStats> {
        self.last_stats
    }

    /// 加载文件并启动解码线程
    ///
    /// 失败时所有已分配的资源（容器、解码器）都会释放，in_use 保持 false
    pub fn load(&mut self, path: &str) -> Result<StreamReport> {
        info!("{} 📂 加载文件: {}", log_ctx(), path);

        if self.shared.is_in_use() {
            warn!("{} ⚠️ 已有正在播放的会话，拒绝加载", log_ctx());
            return Err(PlayerError::SessionBusy);
        }
        self.reap_worker();

        let file = Path::new(path);
        if !file.exists() {
            return Err(PlayerError::NotFound(path.to_string()));
        }

        let mut guard = self.container.lock();

        let mut container = self.backend.open(file)?;
        let streams = container.probe()?;
        let (selected, report) = select_video_stream(&self.backend, &container, &streams)?;
        for line in report.to_string().lines() {
            info!("{} {}", log_ctx(), line);
        }

        let (width, height) = (self.config.output_width, self.config.output_height);
        self.surface.init(width, height)?;

        *guard = Some(container);
        drop(guard);

        let frame_rate = selected.descriptor.frame_rate.as_f64();
        let task: DecodeTask<B> = DecodeTask {
            stream_index: selected.stream_index(),
            decoder: selected.decoder,
            container: self.container.clone(),
            shared: self.shared.clone(),
            surface: self.surface.clone(),
            converter: ColorConverter::new(width, height),
            pacer: FramePacer::new(frame_rate, self.config.fallback_frame_rate),
            snapshot: self.config.snapshot_path.as_ref().map(SnapshotWriter::new),
            events: self.events.clone(),
        };

        self.shared.gate.reset();
        self.shared.set_in_use(true);

        // Started 必须先于解码线程发出的 Finished
        self.send_event(PlaybackEvent::Started {
            path: path.to_string(),
            width,
            height,
            frame_rate,
        });

        let spawned = thread::Builder::new()
            .name("decode".to_string())
            .spawn(move || task.run());

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                // 任务随闭包一起释放
                error!("{} ❌ 无法创建解码线程: {}", log_ctx(), e);
                self.container.lock().take();
                self.shared.set_in_use(false);
                self.send_event(PlaybackEvent::Finished { frames_presented: 0 });
                return Err(e.into());
            }
        }

        info!("{} ✅ 开始播放: {}", log_ctx(), path);
        Ok(report)
    }

    pub fn pause(&self) -> Result<()> {
        if !self.shared.is_in_use() {
            return Err(PlayerError::NoActiveSession);
        }
        info!("{} ⏸️ 暂停", log_ctx());
        self.shared.gate.pause();
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        if !self.shared.is_in_use() {
            return Err(PlayerError::NoActiveSession);
        }
        info!("{} ▶️ 恢复", log_ctx());
        self.shared.gate.resume();
        Ok(())
    }

    /// 停止当前播放：取消解码线程并等待其退出
    ///
    /// 播放已自然结束时只回收线程，返回 NoActiveSession
    pub fn stop(&mut self) -> Result<DecodeStats> {
        if !self.shared.is_in_use() {
            self.reap_worker();
            return Err(PlayerError::NoActiveSession);
        }
        let Some(handle) = self.worker.take() else {
            return Err(PlayerError::NoActiveSession);
        };

        info!("{} ⏹️ 停止播放", log_ctx());
        self.shared.gate.cancel();
        self.join_worker(handle)
            .ok_or(PlayerError::NoActiveSession)
    }

    fn send_event(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// 回收已自然结束的解码线程
    fn reap_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.join_worker(handle);
        }
    }

    fn join_worker(&mut self, handle: JoinHandle<DecodeStats>) -> Option<DecodeStats> {
        match handle.join() {
            Ok(stats) => {
                self.last_stats = Some(stats);
                Some(stats)
            }
            Err(_) => {
                // 线程 panic 时解码器已随栈展开释放，这里补上容器和标志
                error!("{} ❌ 解码线程异常退出", log_ctx());
                self.container.lock().take();
                self.shared.set_in_use(false);
                None
            }
        }
    }
}

impl<B: MediaBackend> Drop for PlaybackSession<B> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::testing::{
        audio_stream, video_stream, MockBackend, MockPacket, RecordingSurface,
    };
    use std::time::{Duration, Instant};

    /// 一个真实存在的路径（后端是内存实现，只需通过存在性检查）
    fn existing_path() -> String {
        std::env::temp_dir().display().to_string()
    }

    fn packets(count: i64) -> Vec<MockPacket> {
        (0..count).map(|seq| MockPacket::video(0, seq)).collect()
    }

    fn session_with(
        backend: MockBackend,
        surface: Arc<RecordingSurface>,
    ) -> PlaybackSession<MockBackend> {
        PlaybackSession::new(backend, PlayerConfig::default(), surface)
    }

    fn wait_until_idle(session: &PlaybackSession<MockBackend>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while session.is_in_use() {
            assert!(Instant::now() < deadline, "解码线程没有结束");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_load_missing_file() {
        let backend = MockBackend::new().with_decoder("h264");
        let counters = backend.counters();
        let mut session = session_with(backend, Arc::new(RecordingSurface::new()));

        let result = session.load("/definitely/not/here.mp4");
        assert!(matches!(result, Err(PlayerError::NotFound(_))));
        assert!(!session.is_in_use());
        assert!(session.worker.is_none());
        assert_eq!(counters.containers_opened(), 0);
    }

    #[test]
    fn test_open_and_probe_failures_leave_session_idle() {
        let backend = MockBackend::new().with_open_failure();
        let mut session = session_with(backend, Arc::new(RecordingSurface::new()));
        assert!(matches!(session.load(&existing_path()), Err(PlayerError::OpenFailed(_))));
        assert!(!session.is_in_use());

        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![video_stream(0, "h264")])
            .with_probe_failure();
        let counters = backend.counters();
        let mut session = session_with(backend, Arc::new(RecordingSurface::new()));
        assert!(matches!(session.load(&existing_path()), Err(PlayerError::ProbeFailed(_))));
        assert!(!session.is_in_use());
        assert_eq!(counters.containers_dropped(), 1);
    }

    #[test]
    fn test_audio_only_file_not_playable() {
        let backend = MockBackend::new()
            .with_decoder("aac")
            .with_streams(vec![audio_stream(0)]);
        let counters = backend.counters();
        let mut session = session_with(backend, Arc::new(RecordingSurface::new()));

        match session.load(&existing_path()) {
            Err(PlayerError::NoVideoStreamPlayable(report)) => {
                assert!(report.to_string().contains("44100"));
                assert_eq!(report.entries[0].descriptor.channels, Some(2));
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.len())),
        }
        assert!(!session.is_in_use());
        assert!(session.worker.is_none());
        assert_eq!(counters.containers_opened(), counters.containers_dropped());
    }

    #[test]
    fn test_surface_init_failure_releases_resources() {
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![video_stream(0, "h264")])
            .with_packets(packets(3));
        let counters = backend.counters();
        let mut session = session_with(backend, Arc::new(RecordingSurface::failing()));

        assert!(matches!(session.load(&existing_path()), Err(PlayerError::SurfaceError(_))));
        assert!(!session.is_in_use());
        assert_eq!(counters.decoders_dropped(), 1);
        assert_eq!(counters.containers_dropped(), 1);
    }

    #[test]
    fn test_playback_runs_to_end_and_allows_reload() {
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![audio_stream(0), video_stream(1, "h264")])
            .with_packets((0..5).map(|seq| MockPacket::video(1, seq)).collect());
        let counters = backend.counters();
        let surface = Arc::new(RecordingSurface::new());
        let mut session = session_with(backend, surface.clone());

        let report = session.load(&existing_path()).unwrap();
        assert_eq!(report.selected().map(|s| s.index), Some(1));
        assert_eq!(surface.inits(), vec![(640, 480)]);

        wait_until_idle(&session);
        assert_eq!(surface.presented_pts(), (0..5).map(Some).collect::<Vec<_>>());

        // 自然结束后可以再次加载
        session.load(&existing_path()).unwrap();
        wait_until_idle(&session);
        assert_eq!(session.last_stats().map(|s| s.frames_presented), Some(5));
        drop(session);

        assert_eq!(counters.containers_opened(), 2);
        assert_eq!(counters.containers_dropped(), 2);
        assert_eq!(counters.decoders_dropped(), 2);
    }

    #[test]
    fn test_load_rejected_while_in_use() {
        let mut slow = video_stream(0, "h264");
        slow.frame_rate = crate::core::Rational::new(5, 1);
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![slow])
            .with_packets(packets(50));
        let counters = backend.counters();
        let surface = Arc::new(RecordingSurface::new());
        let mut session = session_with(backend, surface.clone());

        session.load(&existing_path()).unwrap();
        assert!(session.is_in_use());

        assert!(matches!(session.load(&existing_path()), Err(PlayerError::SessionBusy)));
        assert!(session.is_in_use());
        assert_eq!(counters.containers_opened(), 1);

        let stats = session.stop().unwrap();
        assert!(!session.is_in_use());
        assert!(stats.frames_presented < 50);
        assert_eq!(counters.containers_dropped(), 1);
        assert_eq!(counters.decoders_dropped(), 1);
    }

    #[test]
    fn test_pause_and_resume_skip_no_frames() {
        let mut stream = video_stream(0, "h264");
        stream.frame_rate = crate::core::Rational::new(50, 1);
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![stream])
            .with_packets(packets(10));
        let surface = Arc::new(RecordingSurface::new());
        let mut session = session_with(backend, surface.clone());

        session.load(&existing_path()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while surface.count() < 2 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }

        session.pause().unwrap();
        assert!(session.is_paused());
        // 暂停生效前最多再呈现一帧
        thread::sleep(Duration::from_millis(100));
        let while_paused = surface.count();
        thread::sleep(Duration::from_millis(200));
        assert_eq!(surface.count(), while_paused);

        session.resume().unwrap();
        wait_until_idle(&session);

        assert_eq!(surface.presented_pts(), (0..10).map(Some).collect::<Vec<_>>());
        let _ = session.stop();
    }

    #[test]
    fn test_pause_without_session() {
        let session = session_with(MockBackend::new(), Arc::new(RecordingSurface::new()));
        assert!(matches!(session.pause(), Err(PlayerError::NoActiveSession)));
        assert!(matches!(session.resume(), Err(PlayerError::NoActiveSession)));
    }

    #[test]
    fn test_drop_stops_decode_thread() {
        let mut slow = video_stream(0, "h264");
        slow.frame_rate = crate::core::Rational::new(0, 0);
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![slow])
            .with_packets(packets(20));
        let counters = backend.counters();
        let mut session = session_with(backend, Arc::new(RecordingSurface::new()));

        session.load(&existing_path()).unwrap();
        session.pause().unwrap();
        let started = Instant::now();
        drop(session);

        // 暂停中的线程也会被唤醒并退出
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(counters.decoders_dropped(), 1);
        assert_eq!(counters.containers_dropped(), 1);
    }

    #[test]
    fn test_started_event_precedes_finished() {
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![video_stream(0, "h264")]);
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut session = session_with(backend, Arc::new(RecordingSurface::new())).with_events(tx);

        // 没有数据包时解码线程几乎立即结束
        for _ in 0..200 {
            session.load(&existing_path()).unwrap();
            let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(matches!(first, PlaybackEvent::Started { .. }), "{:?}", first);
            let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(second, PlaybackEvent::Finished { frames_presented: 0 });
            wait_until_idle(&session);
        }
    }

    #[test]
    fn test_stop_after_natural_end() {
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![video_stream(0, "h264")])
            .with_packets(packets(3));
        let mut session = session_with(backend, Arc::new(RecordingSurface::new()));

        session.load(&existing_path()).unwrap();
        wait_until_idle(&session);

        assert!(matches!(session.stop(), Err(PlayerError::NoActiveSession)));
        assert!(session.worker.is_none());
        assert_eq!(session.last_stats().map(|s| s.frames_presented), Some(3));
    }

    #[test]
    fn test_presentations_paced_through_decode_thread() {
        let mut stream = video_stream(0, "h264");
        stream.frame_rate = crate::core::Rational::new(40, 1);
        let backend = MockBackend::new()
            .with_decoder("h264")
            .with_streams(vec![stream])
            .with_packets((0..6).map(|seq| MockPacket::video(0, seq).with_frames(2)).collect());
        let surface = Arc::new(RecordingSurface::new());
        let mut session = session_with(backend, surface.clone());

        session.load(&existing_path()).unwrap();
        wait_until_idle(&session);

        let interval = Duration::from_millis(25);
        let stamps = surface.presented_at();
        assert_eq!(stamps.len(), 12);
        for pair in stamps.windows(2) {
            // 调度误差容忍 2ms
            assert!(pair[1] - pair[0] + Duration::from_millis(2) >= interval);
        }
        let _ = session.stop();
    }
}
