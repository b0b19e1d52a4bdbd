use crossbeam_channel::Receiver;
use egui::{Context, FontData, FontDefinitions, FontFamily, Ui};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::PlaybackEvent;
use crate::renderer::{EguiSurface, VideoTexture};

/// 播放窗口 - 只负责显示，播放控制来自命令行
pub struct PlayerWindow {
    surface: Arc<EguiSurface>,
    events: Receiver<PlaybackEvent>,
    texture: VideoTexture,
    status: PlaybackStatus,
}

#[derive(Debug, Default)]
enum PlaybackStatus {
    #[default]
    Idle,
    Playing {
        path: String,
        frame_rate: f64,
    },
    Finished {
        frames_presented: u64,
    },
}

impl PlayerWindow {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        surface: Arc<EguiSurface>,
        events: Receiver<PlaybackEvent>,
    ) -> Self {
        info!("🎮 初始化播放窗口");

        Self::setup_chinese_fonts(&cc.egui_ctx);
        surface.attach_context(cc.egui_ctx.clone());

        Self {
            surface,
            events,
            texture: VideoTexture::default(),
            status: PlaybackStatus::default(),
        }
    }

    /// 配置中文字体（状态栏使用中文）
    fn setup_chinese_fonts(ctx: &Context) {
        let mut fonts = FontDefinitions::default();

        #[cfg(target_os = "windows")]
        let chinese_font_paths = ["C:/Windows/Fonts/msyh.ttc", "C:/Windows/Fonts/simhei.ttf"];

        #[cfg(target_os = "macos")]
        let chinese_font_paths = ["/System/Library/Fonts/PingFang.ttc"];

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let chinese_font_paths = [
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        ];

        let loaded = chinese_font_paths
            .iter()
            .filter(|path| Path::new(path).exists())
            .find_map(|path| match std::fs::read(path) {
                Ok(data) => Some((*path, data)),
                Err(e) => {
                    warn!("⚠️ 无法读取字体文件 {}: {}", path, e);
                    None
                }
            });

        match loaded {
            Some((path, data)) => {
                fonts
                    .font_data
                    .insert("chinese_font".to_owned(), FontData::from_owned(data));
                for family in [FontFamily::Proportional, FontFamily::Monospace] {
                    if let Some(names) = fonts.families.get_mut(&family) {
                        names.insert(0, "chinese_font".to_owned());
                    }
                }
                info!("✅ 成功加载中文字体: {}", path);
            }
            None => warn!("⚠️ 未找到可用的中文字体文件，中文可能显示为方块"),
        }

        ctx.set_fonts(fonts);
    }

    fn handle_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.status = match event {
                PlaybackEvent::Started { path, frame_rate, .. } => {
                    PlaybackStatus::Playing { path, frame_rate }
                }
                PlaybackEvent::Finished { frames_presented } => {
                    PlaybackStatus::Finished { frames_presented }
                }
            };
        }
    }

    fn render_video_area(&mut self, ui: &mut Ui) {
        let rect = ui.available_rect_before_wrap();
        ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);

        let Some(handle) = self.texture.handle() else {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "在终端输入 load <文件路径> 开始播放",
                egui::FontId::proportional(18.0),
                egui::Color32::GRAY,
            );
            return;
        };

        // 表面纵轴自下而上：缓冲区第 0 行画在底部
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 1.0), egui::pos2(1.0, 0.0));
        ui.painter().image(handle.id(), rect, uv, egui::Color32::WHITE);
    }

    fn render_status_bar(&self, ctx: &Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.status {
                    PlaybackStatus::Idle => ui.label("空闲"),
                    PlaybackStatus::Playing { path, frame_rate } => {
                        ui.label(format!("▶ {}  ({:.2} fps)", path, frame_rate))
                    }
                    PlaybackStatus::Finished { frames_presented } => {
                        ui.label(format!("播放结束，共 {} 帧", frames_presented))
                    }
                };
                if let Some((w, h)) = self.texture.size() {
                    ui.separator();
                    ui.label(format!("{}x{}", w, h));
                }
            });
        });
    }
}

impl eframe::App for PlayerWindow {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_events();

        if let Some((width, height)) = self.surface.take_pending_size() {
            self.texture.clear();
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(
                width as f32,
                height as f32,
            )));
        }

        if let Some(frame) = self.surface.take_latest() {
            self.texture.upload(ctx, &frame);
        }

        self.render_status_bar(ctx);
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.render_video_area(ui));

        // 呈现线程会主动请求重绘，这里只保证状态栏刷新
        ctx.request_repaint_after(Duration::from_millis(250));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("🔚 播放窗口关闭（已上传 {} 帧）", self.texture.frames_uploaded());
    }
}
