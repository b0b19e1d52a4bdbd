use serde::{Deserialize, Serialize};
use std::fmt;

/// 媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Unknown,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "视频",
            MediaType::Audio => "音频",
            MediaType::Unknown => "未知",
        }
    }
}

/// 有理数（时间基 / 帧率）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 分母为 0 时返回 0.0
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// 流描述信息 - 探测后不再改变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub index: usize,
    pub media_type: MediaType,
    pub codec: String,
    pub time_base: Rational,
    pub frame_rate: Rational,
    pub start_time: i64,
    pub duration: i64,
    // 视频
    pub width: Option<u32>,
    pub height: Option<u32>,
    // 音频
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

impl StreamDescriptor {
    /// 生成一行人类可读的流信息
    pub fn describe(&self) -> String {
        let mut line = format!(
            "流 #{} [{}] 编码: {}, 时间基: {}, 起始: {}, 时长: {}",
            self.index,
            self.media_type.as_str(),
            self.codec,
            self.time_base,
            self.start_time,
            self.duration
        );
        match self.media_type {
            MediaType::Video => {
                line.push_str(&format!(
                    ", 分辨率: {}x{}, 帧率: {} ({:.3} fps)",
                    self.width.unwrap_or(0),
                    self.height.unwrap_or(0),
                    self.frame_rate,
                    self.frame_rate.as_f64()
                ));
            }
            MediaType::Audio => {
                line.push_str(&format!(
                    ", 声道: {}, 采样率: {} Hz",
                    self.channels.unwrap_or(0),
                    self.sample_rate.unwrap_or(0)
                ));
            }
            MediaType::Unknown => {}
        }
        line
    }
}

/// 像素格式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    YUV420P,
    RGB24,
    Other(String),
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::YUV420P => f.write_str("yuv420p"),
            PixelFormat::RGB24 => f.write_str("rgb24"),
            PixelFormat::Other(name) => f.write_str(name),
        }
    }
}

/// 单个像素平面
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Vec<u8>,
    pub stride: usize,
}

/// 解码器输出的原始帧（平面格式）
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub pts: Option<i64>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<Plane>,
}

/// 转换后的视频帧（RGB24，扫描线自下而上）
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pts: Option<i64>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

/// 流选择过程中每条流的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum StreamStatus {
    /// 已选中并打开解码器
    Selected,
    /// 仅记录信息
    Described,
    /// 找不到解码器，已跳过
    NoDecoder,
    /// 解码器打开失败，已跳过
    OpenFailed(String),
}

#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub descriptor: StreamDescriptor,
    pub status: StreamStatus,
}

/// 加载报告：逐条流的信息
#[derive(Debug, Clone, Default)]
pub struct StreamReport {
    pub entries: Vec<StreamEntry>,
}

impl StreamReport {
    pub fn push(&mut self, descriptor: StreamDescriptor, status: StreamStatus) {
        self.entries.push(StreamEntry { descriptor, status });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn selected(&self) -> Option<&StreamDescriptor> {
        self.entries
            .iter()
            .find(|e| e.status == StreamStatus::Selected)
            .map(|e| &e.descriptor)
    }
}

impl fmt::Display for StreamReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let note = match &entry.status {
                StreamStatus::Selected => " <- 已选中".to_string(),
                StreamStatus::Described => String::new(),
                StreamStatus::NoDecoder => " (无可用解码器，已跳过)".to_string(),
                StreamStatus::OpenFailed(reason) => format!(" (解码器打开失败: {})", reason),
            };
            writeln!(f, "{}{}", entry.descriptor.describe(), note)?;
        }
        Ok(())
    }
}

/// 播放事件（解码线程 / 会话 → 窗口）
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started {
        path: String,
        width: u32,
        height: u32,
        frame_rate: f64,
    },
    Finished {
        frames_presented: u64,
    },
}
