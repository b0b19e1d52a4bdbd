use crate::core::StreamReport;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("FFmpeg 错误: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("文件不存在: {0}")]
    NotFound(String),

    #[error("无法打开文件: {0}")]
    OpenFailed(String),

    #[error("无法读取流信息: {0}")]
    ProbeFailed(String),

    #[error("流 #{stream} 找不到解码器 ({codec})")]
    NoDecoderAvailable { stream: usize, codec: String },

    #[error("流 #{stream} 解码器打开失败: {reason}")]
    DecoderOpenFailed { stream: usize, reason: String },

    #[error("没有可播放的视频流（共检查 {} 条流）", .0.len())]
    NoVideoStreamPlayable(StreamReport),

    #[error("提交数据包失败: {0}")]
    DecodeSubmitFailed(String),

    #[error("接收解码帧失败: {0}")]
    DecodeReceiveFailed(String),

    #[error("不支持的像素格式: {0}")]
    UnsupportedPixelFormat(String),

    #[error("已有正在播放的会话")]
    SessionBusy,

    #[error("当前没有正在播放的会话")]
    NoActiveSession,

    #[error("显示表面错误: {0}")]
    SurfaceError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("快照写入失败: {0}")]
    SnapshotError(String),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
