// 播放器核心模块

pub mod backend;
pub mod demuxer;
pub mod decoder;
pub mod selector;
pub mod convert;
pub mod pacer;
pub mod decode_loop;
pub mod snapshot;
pub mod session;

#[cfg(test)]
pub mod testing;

pub use demuxer::FfmpegBackend;
pub use decode_loop::DecodeStats;
pub use session::PlaybackSession;
