use crate::core::{
    log_ctx, MediaType, PlayerError, Result, StreamDescriptor, StreamReport, StreamStatus,
};
use crate::player::backend::{MediaBackend, VideoDecoding};
use log::{error, info, warn};

/// 选中的视频流 + 已打开的解码器
pub struct SelectedStream<D> {
    pub descriptor: StreamDescriptor,
    pub decoder: D,
}

impl<D> SelectedStream<D> {
    pub fn stream_index(&self) -> usize {
        self.descriptor.index
    }
}

/// 流选择器
///
/// 按索引顺序检查每条流：找不到解码器的流跳过；第一条能成功打开解码器的视频流被选中，
/// 之后的视频流只记录信息不再打开。音频流只记录元数据，从不解码。
///
/// 成功时返回选中的流和完整报告；没有任何视频流可播放时返回
/// `NoVideoStreamPlayable`（携带报告），已分配的解码器随之释放。
pub fn select_video_stream<B: MediaBackend>(
    backend: &B,
    container: &B::Container,
    streams: &[StreamDescriptor],
) -> Result<(SelectedStream<B::Decoder>, StreamReport)> {
    let mut report = StreamReport::default();
    let mut selected: Option<SelectedStream<B::Decoder>> = None;

    for stream in streams {
        let Some(template) = backend.find_decoder(container, stream) else {
            let skipped = PlayerError::NoDecoderAvailable {
                stream: stream.index,
                codec: stream.codec.clone(),
            };
            warn!("{} ⚠️ {}，已跳过", log_ctx(), skipped);
            report.push(stream.clone(), StreamStatus::NoDecoder);
            continue;
        };

        info!("{} {}", log_ctx(), stream.describe());

        let status = match stream.media_type {
            MediaType::Video if selected.is_none() => {
                match backend.open_decoder(container, template, stream) {
                    Ok(decoder) => {
                        info!(
                            "{} ✅ 选中视频流 #{}: {}",
                            log_ctx(),
                            stream.index,
                            decoder.describe()
                        );
                        selected = Some(SelectedStream {
                            descriptor: stream.clone(),
                            decoder,
                        });
                        StreamStatus::Selected
                    }
                    Err(e) => {
                        error!("{} ❌ 流 #{} 解码器打开失败: {}，继续查找", log_ctx(), stream.index, e);
                        StreamStatus::OpenFailed(e.to_string())
                    }
                }
            }
            _ => StreamStatus::Described,
        };

        report.push(stream.clone(), status);
    }

    match selected {
        Some(selected) => Ok((selected, report)),
        None => {
            error!("{} ❌ 没有可播放的视频流", log_ctx());
            Err(PlayerError::NoVideoStreamPlayable(report))
        }
    }
}
