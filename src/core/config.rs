use crate::core::{PlayerError, Result};
use crate::player::pacer::frame_interval;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 播放器配置（JSON 文件，缺省字段使用默认值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// 颜色转换的固定输出宽度
    pub output_width: u32,
    /// 颜色转换的固定输出高度
    pub output_height: u32,
    /// 流帧率为 0 或缺失时使用的帧率
    pub fallback_frame_rate: f64,
    /// 诊断快照路径（首帧写入 PNG）
    pub snapshot_path: Option<PathBuf>,
    pub window_title: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            output_width: 640,
            output_height: 480,
            fallback_frame_rate: 1.0,
            snapshot_path: None,
            window_title: "Video Player".to_string(),
        }
    }
}

impl PlayerConfig {
    /// 从 JSON 文件加载；未指定路径时返回默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        info!("📄 读取配置文件: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| PlayerError::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(PlayerError::ConfigError(format!(
                "输出分辨率无效: {}x{}",
                self.output_width, self.output_height
            )));
        }
        if frame_interval(self.fallback_frame_rate).is_none() {
            return Err(PlayerError::ConfigError(format!(
                "默认帧率无效: {}",
                self.fallback_frame_rate
            )));
        }
        Ok(())
    }
}
