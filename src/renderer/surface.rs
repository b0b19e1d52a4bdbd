use crate::core::{log_ctx, Result, VideoFrame};
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};

/// 显示表面
///
/// 接收固定尺寸的 RGB24 缓冲区并显示。表面纵轴从底部开始，
/// 因此缓冲区的第 0 行是画面最下面一行。
pub trait PresentSurface: Send + Sync {
    /// 每次加载时按输出尺寸初始化
    fn init(&self, width: u32, height: u32) -> Result<()>;

    /// 同步呈现一帧
    fn present(&self, frame: VideoFrame);

    fn name(&self) -> &'static str;
}

/// 无窗口表面：只统计帧数
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    presented: AtomicU64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresentSurface for HeadlessSurface {
    fn init(&self, width: u32, height: u32) -> Result<()> {
        info!("{} 🖥️ 无窗口模式输出: {}x{}", log_ctx(), width, height);
        self.presented.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn present(&self, frame: VideoFrame) {
        let count = self.presented.fetch_add(1, Ordering::Relaxed) + 1;
        if count <= 5 || count % 100 == 0 {
            debug!(
                "{} 🎞️ 呈现第 {} 帧 (pts: {:?}, {}x{})",
                log_ctx(),
                count,
                frame.pts,
                frame.width,
                frame.height
            );
        }
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}
