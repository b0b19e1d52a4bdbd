use log::debug;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// 暂停闸门等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// 未暂停，直接通过
    Running,
    /// 曾经暂停，刚刚恢复
    Resumed,
    /// 已取消（会话停止）
    Cancelled,
}

#[derive(Debug, Default)]
struct GateFlags {
    paused: bool,
    cancelled: bool,
}

/// 暂停闸门 - 条件变量实现的暂停 / 恢复 / 取消
///
/// 控制线程只翻转标志并唤醒，解码线程在下一次检查时生效
#[derive(Debug, Default)]
pub struct PauseGate {
    flags: Mutex<GateFlags>,
    cond: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.flags.lock().paused = true;
        self.cond.notify_all();
    }

    pub fn resume(&self) {
        self.flags.lock().paused = false;
        self.cond.notify_all();
    }

    pub fn cancel(&self) {
        self.flags.lock().cancelled = true;
        self.cond.notify_all();
    }

    /// 新会话开始前重置
    pub fn reset(&self) {
        let mut flags = self.flags.lock();
        flags.paused = false;
        flags.cancelled = false;
    }

    pub fn is_paused(&self) -> bool {
        self.flags.lock().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.lock().cancelled
    }

    /// 暂停期间阻塞，直到恢复或取消
    pub fn wait_while_paused(&self) -> GateState {
        let mut flags = self.flags.lock();
        if flags.cancelled {
            return GateState::Cancelled;
        }
        if !flags.paused {
            return GateState::Running;
        }

        debug!("⏸️ 解码线程进入暂停等待");
        while flags.paused && !flags.cancelled {
            self.cond.wait(&mut flags);
        }

        if flags.cancelled {
            GateState::Cancelled
        } else {
            debug!("▶️ 解码线程恢复");
            GateState::Resumed
        }
    }

    /// 定时睡眠；暂停 / 恢复 / 取消会提前唤醒
    pub fn sleep(&self, timeout: Duration) {
        let mut flags = self.flags.lock();
        if flags.paused || flags.cancelled {
            return;
        }
        self.cond.wait_for(&mut flags, timeout);
    }
}

/// 帧率对应的帧间隔；非正数或间隔超出 Duration 范围时返回 None
pub fn frame_interval(rate: f64) -> Option<Duration> {
    if !(rate.is_finite() && rate > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rate).ok()
}

/// 帧节奏控制 - 两次呈现之间至少间隔 1/frame_rate 秒
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    last_present: Option<Instant>,
}

impl FramePacer {
    /// 帧率为 0 / 非法时使用 fallback_rate，两者都不可用时 1 帧 / 秒
    pub fn new(frame_rate: f64, fallback_rate: f64) -> Self {
        let interval = frame_interval(frame_rate)
            .or_else(|| frame_interval(fallback_rate))
            .unwrap_or(Duration::from_secs(1));

        Self {
            interval,
            last_present: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 阻塞到可以呈现下一帧；返回 false 表示已取消
    ///
    /// 每轮先检查暂停：暂停结束后计时从恢复时刻重新开始，不会追帧
    pub fn wait(&mut self, gate: &PauseGate) -> bool {
        loop {
            match gate.wait_while_paused() {
                GateState::Cancelled => return false,
                GateState::Resumed => self.last_present = Some(Instant::now()),
                GateState::Running => {}
            }

            let Some(last) = self.last_present else {
                // 第一帧立即呈现
                self.last_present = Some(Instant::now());
                return true;
            };

            let elapsed = last.elapsed();
            if elapsed >= self.interval {
                self.last_present = Some(Instant::now());
                return true;
            }

            gate.sleep(self.interval - elapsed);
        }
    }
}
