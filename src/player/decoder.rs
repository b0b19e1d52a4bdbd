use crate::core::{PixelFormat, Plane, PlayerError, RawFrame, Result};
use crate::player::backend::{DecodeStatus, VideoDecoding};
use crate::player::demuxer::FfmpegPacket;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{codec, format, util};
use log::debug;

/// FFmpeg 软件视频解码器
pub struct FfmpegVideoDecoder {
    decoder: codec::decoder::Video,
    codec_name: String,
}

// AVCodecContext 创建后整体移交给解码线程，此后只在该线程中使用
unsafe impl Send for FfmpegVideoDecoder {}

impl FfmpegVideoDecoder {
    /// 用流参数填充解码器上下文并打开解码器
    pub fn open(stream: format::stream::Stream, codec: codec::Codec) -> Result<Self> {
        let codec_name = codec.name().to_string();
        let context = codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context.decoder().open_as(codec)?.video()?;

        debug!(
            "软件解码器 {}: {}x{}, 格式: {:?}",
            codec_name,
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(Self {
            decoder,
            codec_name,
        })
    }

    /// 把 FFmpeg 帧复制到独立内存；非 YUV420P 帧只保留格式信息
    fn copy_frame(frame: &util::frame::Video) -> RawFrame {
        let format = match frame.format() {
            format::Pixel::YUV420P => PixelFormat::YUV420P,
            other => PixelFormat::Other(format!("{:?}", other).to_lowercase()),
        };

        let planes = if format == PixelFormat::YUV420P {
            (0..3)
                .map(|i| Plane {
                    data: frame.data(i).to_vec(),
                    stride: frame.stride(i),
                })
                .collect()
        } else {
            Vec::new()
        };

        RawFrame {
            pts: frame.timestamp(),
            width: frame.width(),
            height: frame.height(),
            format,
            planes,
        }
    }
}

/// receive_frame 的错误分类：EAGAIN / EOF 是正常的停止信号
fn receive_error_status(error: ffmpeg::Error) -> Result<DecodeStatus> {
    match error {
        ffmpeg::Error::Other { errno } if errno == ffmpeg::error::EAGAIN => {
            Ok(DecodeStatus::NeedsMoreInput)
        }
        ffmpeg::Error::Eof => Ok(DecodeStatus::EndOfStream),
        e => Err(PlayerError::DecodeReceiveFailed(e.to_string())),
    }
}

impl VideoDecoding for FfmpegVideoDecoder {
    type Packet = FfmpegPacket;

    fn submit(&mut self, packet: &FfmpegPacket) -> Result<()> {
        self.decoder
            .send_packet(&packet.packet)
            .map_err(|e| PlayerError::DecodeSubmitFailed(e.to_string()))
    }

    fn receive(&mut self) -> Result<DecodeStatus> {
        let mut decoded_frame = util::frame::Video::empty();
        match self.decoder.receive_frame(&mut decoded_frame) {
            Ok(()) => Ok(DecodeStatus::Frame(Self::copy_frame(&decoded_frame))),
            Err(e) => receive_error_status(e),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.decoder.send_eof()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("软件解码 ({})", self.codec_name)
    }
}
