// 显示表面：egui 窗口 / 无窗口

pub mod surface;
pub mod egui_surface;

pub use surface::{HeadlessSurface, PresentSurface};
pub use egui_surface::{EguiSurface, VideoTexture};
