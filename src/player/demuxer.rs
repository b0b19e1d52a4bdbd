use crate::core::{log_ctx, MediaType, PlayerError, Rational, Result, StreamDescriptor};
use crate::player::backend::{ContainerHandle, MediaBackend, MediaPacket};
use crate::player::decoder::FfmpegVideoDecoder;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{codec, format, media};
use log::{debug, info};
use std::path::Path;

/// FFmpeg 数据包（带来源流索引）
pub struct FfmpegPacket {
    pub packet: ffmpeg::Packet,
    stream_index: usize,
}

// 实现 Send，允许跨线程传递
unsafe impl Send for FfmpegPacket {}

impl MediaPacket for FfmpegPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }
}

/// 解封装器 - 持有打开的 FFmpeg 输入上下文
pub struct FfmpegDemuxer {
    input_ctx: format::context::Input,
    source_path: String,
}

// AVFormatContext 只在持有会话容器锁时访问，同一时刻只有一个线程使用
unsafe impl Send for FfmpegDemuxer {}

impl FfmpegDemuxer {
    /// 打开媒体文件（FFmpeg 在打开时同时完成流信息探测）
    pub fn open(path: &Path) -> Result<Self> {
        info!("{} 正在打开文件: {}", log_ctx(), path.display());

        if !path.exists() {
            return Err(PlayerError::NotFound(path.display().to_string()));
        }

        let input_ctx = format::input(&path)
            .map_err(|e| PlayerError::OpenFailed(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            input_ctx,
            source_path: path.display().to_string(),
        })
    }

    pub fn stream(&self, index: usize) -> Option<format::stream::Stream> {
        self.input_ctx.stream(index)
    }

    fn describe_stream(stream: &format::stream::Stream) -> StreamDescriptor {
        let params = stream.parameters();
        let media_type = match params.medium() {
            media::Type::Video => MediaType::Video,
            media::Type::Audio => MediaType::Audio,
            _ => MediaType::Unknown,
        };
        let codec_name = params.id().name().to_string();

        // 平均帧率缺失时退回到 r_frame_rate
        let avg = stream.avg_frame_rate();
        let frame_rate = if avg.numerator() > 0 && avg.denominator() > 0 {
            avg
        } else {
            stream.rate()
        };
        let time_base = stream.time_base();

        let mut descriptor = StreamDescriptor {
            index: stream.index(),
            media_type,
            codec: codec_name,
            time_base: Rational::new(time_base.numerator(), time_base.denominator()),
            frame_rate: Rational::new(frame_rate.numerator(), frame_rate.denominator()),
            start_time: stream.start_time(),
            duration: stream.duration(),
            width: None,
            height: None,
            channels: None,
            sample_rate: None,
        };

        CodecMetadata::read(&params).apply(&mut descriptor);
        descriptor
    }
}

impl ContainerHandle for FfmpegDemuxer {
    type Packet = FfmpegPacket;

    fn probe(&mut self) -> Result<Vec<StreamDescriptor>> {
        let streams: Vec<StreamDescriptor> = self
            .input_ctx
            .streams()
            .map(|stream| Self::describe_stream(&stream))
            .collect();

        if streams.is_empty() {
            return Err(PlayerError::ProbeFailed(format!(
                "{} 中没有任何流",
                self.source_path
            )));
        }

        debug!("{} 探测到 {} 条流", log_ctx(), streams.len());
        Ok(streams)
    }

    fn next_packet(&mut self) -> Result<Option<FfmpegPacket>> {
        let mut packet = ffmpeg::Packet::empty();
        match packet.read(&mut self.input_ctx) {
            Ok(()) => {
                let stream_index = packet.stream();
                Ok(Some(FfmpegPacket {
                    packet,
                    stream_index,
                }))
            }
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// 编解码参数里的画面 / 音频元数据
///
/// 直接读取 AVCodecParameters，不打开解码器；只有选中的视频流才会打开解码器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CodecMetadata {
    width: i32,
    height: i32,
    channels: i32,
    sample_rate: i32,
}

impl CodecMetadata {
    fn read(params: &codec::Parameters) -> Self {
        // 参数由所属的流持有，这里只读字段
        unsafe {
            let raw = params.as_ptr();
            Self {
                width: (*raw).width,
                height: (*raw).height,
                channels: (*raw).ch_layout.nb_channels,
                sample_rate: (*raw).sample_rate,
            }
        }
    }

    /// 非正值视为缺失
    fn apply(self, descriptor: &mut StreamDescriptor) {
        let positive = |value: i32| u32::try_from(value).ok().filter(|v| *v > 0);

        match descriptor.media_type {
            MediaType::Video => {
                descriptor.width = positive(self.width);
                descriptor.height = positive(self.height);
            }
            MediaType::Audio => {
                descriptor.channels = positive(self.channels).and_then(|c| u16::try_from(c).ok());
                descriptor.sample_rate = positive(self.sample_rate);
            }
            MediaType::Unknown => {}
        }
    }
}

/// 基于 FFmpeg 的媒体后端
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegBackend;

impl MediaBackend for FfmpegBackend {
    type Packet = FfmpegPacket;
    type Container = FfmpegDemuxer;
    type Decoder = FfmpegVideoDecoder;
    type Template = codec::Codec;

    fn open(&self, path: &Path) -> Result<FfmpegDemuxer> {
        FfmpegDemuxer::open(path)
    }

    fn find_decoder(
        &self,
        container: &FfmpegDemuxer,
        stream: &StreamDescriptor,
    ) -> Option<codec::Codec> {
        let id = container.stream(stream.index)?.parameters().id();
        codec::decoder::find(id)
    }

    fn open_decoder(
        &self,
        container: &FfmpegDemuxer,
        template: codec::Codec,
        stream: &StreamDescriptor,
    ) -> Result<FfmpegVideoDecoder> {
        let av_stream = container.stream(stream.index).ok_or_else(|| {
            PlayerError::DecoderOpenFailed {
                stream: stream.index,
                reason: "流不存在".to_string(),
            }
        })?;
        FfmpegVideoDecoder::open(av_stream, template).map_err(|e| PlayerError::DecoderOpenFailed {
            stream: stream.index,
            reason: e.to_string(),
        })
    }
}
