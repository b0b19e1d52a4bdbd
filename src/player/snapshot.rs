use crate::core::{log_ctx, PlayerError, Result, VideoFrame};
use crate::player::convert::{flip_vertical, RGB_BYTES_PER_PIXEL};
use log::info;
use std::path::PathBuf;

/// 诊断快照：把一帧写成 PNG
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn write(&self, frame: &VideoFrame) -> Result<()> {
        let (width, height) = (frame.width as usize, frame.height as usize);
        if frame.data.len() != width * height * RGB_BYTES_PER_PIXEL {
            return Err(PlayerError::SnapshotError(format!(
                "缓冲区大小与 {}x{} 不符",
                frame.width, frame.height
            )));
        }

        // 帧数据自下而上，图片文件自上而下
        let mut data = frame.data.clone();
        flip_vertical(&mut data, width, height);

        let image = image::RgbImage::from_raw(frame.width, frame.height, data)
            .ok_or_else(|| PlayerError::SnapshotError("无法构造图像".to_string()))?;
        image
            .save(&self.path)
            .map_err(|e| PlayerError::SnapshotError(format!("{}: {}", self.path.display(), e)))?;

        info!("{} 📸 已写入快照: {}", log_ctx(), self.path.display());
        Ok(())
    }
}
