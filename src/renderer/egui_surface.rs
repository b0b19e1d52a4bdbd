use crate::core::{log_ctx, PlayerError, Result, VideoFrame};
use crate::renderer::PresentSurface;
use egui::{ColorImage, Context, TextureHandle, TextureOptions};
use log::{debug, info};
use parking_lot::Mutex;

/// egui 显示表面 - 只保留最新一帧，由 UI 线程取走并上传为纹理
pub struct EguiSurface {
    latest: Mutex<Option<VideoFrame>>,
    ctx: Mutex<Option<Context>>,
    /// init 请求的新尺寸（UI 线程据此调整窗口）
    pending_size: Mutex<Option<(u32, u32)>>,
}

impl EguiSurface {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            ctx: Mutex::new(None),
            pending_size: Mutex::new(None),
        }
    }

    /// 窗口创建后绑定 egui 上下文，用于请求重绘
    pub fn attach_context(&self, ctx: Context) {
        *self.ctx.lock() = Some(ctx);
    }

    pub fn take_latest(&self) -> Option<VideoFrame> {
        self.latest.lock().take()
    }

    pub fn take_pending_size(&self) -> Option<(u32, u32)> {
        self.pending_size.lock().take()
    }

    fn request_repaint(&self) {
        if let Some(ctx) = self.ctx.lock().as_ref() {
            ctx.request_repaint();
        }
    }
}

impl Default for EguiSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentSurface for EguiSurface {
    fn init(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(PlayerError::SurfaceError(format!(
                "无效的输出尺寸: {}x{}",
                width, height
            )));
        }
        info!("{} 🎨 初始化 egui 显示表面: {}x{}", log_ctx(), width, height);
        *self.latest.lock() = None;
        *self.pending_size.lock() = Some((width, height));
        self.request_repaint();
        Ok(())
    }

    fn present(&self, frame: VideoFrame) {
        // 未被取走的旧帧直接覆盖
        *self.latest.lock() = Some(frame);
        self.request_repaint();
    }

    fn name(&self) -> &'static str {
        "egui"
    }
}

/// 视频纹理 - 把表面上的帧上传到 GPU
#[derive(Default)]
pub struct VideoTexture {
    handle: Option<TextureHandle>,
    size: Option<(u32, u32)>,
    frames_uploaded: u64,
}

impl VideoTexture {
    pub fn upload(&mut self, ctx: &Context, frame: &VideoFrame) {
        let image = ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.data);

        match self.handle.as_mut() {
            Some(handle) => handle.set(image, TextureOptions::LINEAR),
            None => {
                debug!("创建视频纹理: {}x{}", frame.width, frame.height);
                self.handle = Some(ctx.load_texture("video_frame", image, TextureOptions::LINEAR));
            }
        }
        self.size = Some((frame.width, frame.height));
        self.frames_uploaded += 1;
    }

    pub fn handle(&self) -> Option<&TextureHandle> {
        self.handle.as_ref()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn frames_uploaded(&self) -> u64 {
        self.frames_uploaded
    }

    pub fn clear(&mut self) {
        self.handle = None;
        self.size = None;
    }
}
