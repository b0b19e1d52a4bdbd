use crate::core::{log_ctx, PlaybackEvent, RawFrame};
use crate::player::backend::{ContainerHandle, DecodeStatus, MediaBackend, MediaPacket, VideoDecoding};
use crate::player::convert::ColorConverter;
use crate::player::pacer::FramePacer;
use crate::player::session::SessionShared;
use crate::player::snapshot::SnapshotWriter;
use crate::renderer::PresentSurface;
use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// 解码统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
    pub packets_read: u64,
    pub packets_skipped: u64,
    pub frames_decoded: u64,
    pub frames_presented: u64,
    pub frames_dropped: u64,
}

/// 解码线程任务 - 以值的形式移交给解码线程
pub struct DecodeTask<B: MediaBackend> {
    pub stream_index: usize,
    pub decoder: B::Decoder,
    pub container: Arc<Mutex<Option<B::Container>>>,
    pub shared: Arc<SessionShared>,
    pub surface: Arc<dyn PresentSurface>,
    pub converter: ColorConverter,
    pub pacer: FramePacer,
    pub snapshot: Option<SnapshotWriter>,
    pub events: Option<Sender<PlaybackEvent>>,
}

impl<B: MediaBackend> DecodeTask<B> {
    /// 解码循环（在独立线程中运行）
    ///
    /// - 每次只在读取一个包的期间持有容器锁
    /// - 只处理选中流的包，其他流的包读出后立即释放
    /// - 到达文件末尾后 flush 解码器取出剩余帧
    /// - 退出时释放解码器和容器，并清除 in_use
    pub fn run(mut self) -> DecodeStats {
        info!(
            "{} 🎬 解码线程启动: 流 #{}, {}, 帧间隔 {:?}",
            log_ctx(),
            self.stream_index,
            self.decoder.describe(),
            self.pacer.interval()
        );

        let mut stats = DecodeStats::default();

        loop {
            if self.shared.gate.is_cancelled() {
                info!("{} ⏹ 解码线程收到停止请求", log_ctx());
                break;
            }

            let next = {
                let mut guard = self.container.lock();
                match guard.as_mut() {
                    Some(container) => container.next_packet(),
                    None => Ok(None),
                }
            };

            let packet = match next {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    info!("{} 📄 到达文件末尾", log_ctx());
                    self.drain_after_eof(&mut stats);
                    break;
                }
                Err(e) => {
                    error!("{} ❌ 读取包失败: {}", log_ctx(), e);
                    break;
                }
            };

            stats.packets_read += 1;
            if packet.stream_index() != self.stream_index {
                continue;
            }

            if let Err(e) = self.decoder.submit(&packet) {
                warn!("{} ⚠️ {}，跳过该包", log_ctx(), e);
                stats.packets_skipped += 1;
                continue;
            }
            drop(packet);

            if !self.drain_frames(&mut stats) {
                info!("{} ⏹ 呈现等待被取消", log_ctx());
                break;
            }
        }

        self.finish(stats)
    }

    /// 反复 receive 直到解码器需要更多输入；返回 false 表示已取消
    fn drain_frames(&mut self, stats: &mut DecodeStats) -> bool {
        loop {
            match self.decoder.receive() {
                Ok(DecodeStatus::Frame(raw)) => {
                    stats.frames_decoded += 1;
                    if !self.present(raw, stats) {
                        return false;
                    }
                }
                Ok(DecodeStatus::NeedsMoreInput) | Ok(DecodeStatus::EndOfStream) => return true,
                Err(e) => {
                    warn!("{} ⚠️ 解码错误（已跳过）: {}", log_ctx(), e);
                    return true;
                }
            }
        }
    }

    fn drain_after_eof(&mut self, stats: &mut DecodeStats) {
        if let Err(e) = self.decoder.flush() {
            warn!("{} ⚠️ flush 解码器失败: {}", log_ctx(), e);
            return;
        }
        self.drain_frames(stats);
    }

    /// 转换 → 节奏控制 → 呈现；返回 false 表示已取消
    fn present(&mut self, raw: RawFrame, stats: &mut DecodeStats) -> bool {
        let frame = match self.converter.convert(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("{} 丢弃帧 (pts: {:?}): {}", log_ctx(), raw.pts, e);
                stats.frames_dropped += 1;
                return true;
            }
        };
        drop(raw);

        if !self.pacer.wait(&self.shared.gate) {
            return false;
        }

        if let Some(writer) = self.snapshot.take() {
            if let Err(e) = writer.write(&frame) {
                error!("{} ❌ {}", log_ctx(), e);
            }
        }

        self.surface.present(frame);
        stats.frames_presented += 1;
        true
    }

    fn finish(self, stats: DecodeStats) -> DecodeStats {
        let DecodeTask {
            decoder,
            container,
            shared,
            events,
            ..
        } = self;

        drop(decoder);
        container.lock().take();
        shared.set_in_use(false);

        info!(
            "{} 🛑 解码线程退出（读取 {} 个包，跳过 {} 个；解码 {} 帧，呈现 {} 帧，丢弃 {} 帧）",
            log_ctx(),
            stats.packets_read,
            stats.packets_skipped,
            stats.frames_decoded,
            stats.frames_presented,
            stats.frames_dropped
        );

        if let Some(events) = events {
            let _ = events.send(PlaybackEvent::Finished {
                frames_presented: stats.frames_presented,
            });
        }

        stats
    }
}
