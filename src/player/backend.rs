use crate::core::{RawFrame, Result, StreamDescriptor};
use std::path::Path;

/// 媒体包抽象：只需要知道来源流
pub trait MediaPacket: Send {
    fn stream_index(&self) -> usize;
}

/// 解码器一次 receive 的结果
#[derive(Debug)]
pub enum DecodeStatus {
    /// 解码出一帧
    Frame(RawFrame),
    /// 需要更多输入（EAGAIN）
    NeedsMoreInput,
    /// 解码器已输出全部帧
    EndOfStream,
}

/// 容器句柄：打开的媒体文件
///
/// 读取下一个包会修改内部状态，必须在会话的容器锁内调用
pub trait ContainerHandle: Send + 'static {
    type Packet: MediaPacket;

    /// 枚举所有流的描述信息
    fn probe(&mut self) -> Result<Vec<StreamDescriptor>>;

    /// 读取下一个包
    ///
    /// 返回：
    /// - Ok(Some(packet)): 成功读取一个包
    /// - Ok(None): 到达文件末尾
    /// - Err(e): 读取错误
    fn next_packet(&mut self) -> Result<Option<Self::Packet>>;
}

/// 视频解码器状态机（send / receive 模型）
pub trait VideoDecoding: Send + 'static {
    type Packet: MediaPacket;

    fn submit(&mut self, packet: &Self::Packet) -> Result<()>;

    fn receive(&mut self) -> Result<DecodeStatus>;

    /// 通知解码器输入结束，之后 receive 会吐出缓冲中的剩余帧
    fn flush(&mut self) -> Result<()>;

    /// 解码器描述（用于日志）
    fn describe(&self) -> String {
        String::from("视频解码器")
    }
}

/// 媒体后端：打开容器、查找并打开解码器
pub trait MediaBackend: Send + Sync + 'static {
    type Packet: MediaPacket;
    type Container: ContainerHandle<Packet = Self::Packet>;
    type Decoder: VideoDecoding<Packet = Self::Packet>;
    /// 解码器模板（找到但尚未打开的解码器）
    type Template;

    fn open(&self, path: &Path) -> Result<Self::Container>;

    fn find_decoder(
        &self,
        container: &Self::Container,
        stream: &StreamDescriptor,
    ) -> Option<Self::Template>;

    fn open_decoder(
        &self,
        container: &Self::Container,
        template: Self::Template,
        stream: &StreamDescriptor,
    ) -> Result<Self::Decoder>;
}
