// 命令行交互：逐行读取命令并驱动播放会话

use crate::core::{log_ctx, PlayerError};
use crate::player::backend::MediaBackend;
use crate::player::session::PlaybackSession;
use log::{debug, error};
use std::io::{self, BufRead, Write};

/// 按单个空格切分命令行
///
/// 长度不超过 1 字节的片段会被丢弃，因此单字符参数（包括单字符文件名）不会出现在结果中
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(' ')
        .filter(|token| token.len() > 1)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    /// 缺少路径参数时为 None
    Load(Option<String>),
    Pause,
    Resume,
    Stop,
    Exit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut tokens = tokenize(line).into_iter();
        let Some(name) = tokens.next() else {
            return Command::Empty;
        };

        match name.as_str() {
            "help" => Command::Help,
            "load" => Command::Load(tokens.next()),
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "exit" => Command::Exit,
            _ => Command::Unknown(name),
        }
    }
}

pub const BANNER: &str = "视频播放器 - Beta\n\t输入 'help' 查看使用方法。\n";

const USAGE: &str = "-- [帮助] --\n\
\tload <文件路径>\t加载文件并开始播放\n\
\tpause\t\t暂停播放\n\
\tresume\t\t恢复播放\n\
\tstop\t\t停止当前播放\n\
\texit\t\t退出程序\n";

/// 命令处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Exit,
}

pub struct CommandShell<B: MediaBackend> {
    session: PlaybackSession<B>,
}

impl<B: MediaBackend> CommandShell<B> {
    pub fn new(session: PlaybackSession<B>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &PlaybackSession<B> {
        &self.session
    }

    /// 处理一行输入；普通消息写到 out，错误写到 err
    pub fn handle_line(
        &mut self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<ShellFlow> {
        let command = Command::parse(line);
        debug!("{} 收到命令: {:?}", log_ctx(), command);

        match command {
            Command::Empty => writeln!(out, "未收到命令。")?,
            Command::Help => write!(out, "{}", USAGE)?,
            Command::Load(None) => {
                writeln!(err, "错误: 参数数量不正确。\n\t用法: load <文件路径>")?;
            }
            Command::Load(Some(path)) => match self.session.load(&path) {
                Ok(report) => {
                    write!(out, "{}", report)?;
                    writeln!(out, "开始播放: {}", path)?;
                }
                Err(e) => report_error(err, &e)?,
            },
            Command::Pause if self.session.is_paused() && self.session.is_in_use() => {
                writeln!(out, "已经处于暂停状态。")?
            }
            Command::Pause => match self.session.pause() {
                Ok(()) => writeln!(out, "已暂停。")?,
                Err(e) => report_error(err, &e)?,
            },
            Command::Resume => match self.session.resume() {
                Ok(()) => writeln!(out, "已恢复。")?,
                Err(e) => report_error(err, &e)?,
            },
            Command::Stop => match self.session.stop() {
                Ok(stats) => writeln!(out, "已停止（共呈现 {} 帧）。", stats.frames_presented)?,
                Err(e) => report_error(err, &e)?,
            },
            Command::Exit => {
                writeln!(out, "程序退出。")?;
                return Ok(ShellFlow::Exit);
            }
            Command::Unknown(name) => writeln!(out, "未知命令 [{}]", name)?,
        }

        writeln!(out)?;
        Ok(ShellFlow::Continue)
    }

    /// 读到 exit 或输入结束为止
    pub fn run(
        &mut self,
        input: impl BufRead,
        mut out: impl Write,
        mut err: impl Write,
    ) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let flow = self.handle_line(&line, &mut out, &mut err)?;
            out.flush()?;
            if flow == ShellFlow::Exit {
                break;
            }
        }

        if self.session.stop().is_ok() {
            debug!("{} 退出前已停止播放", log_ctx());
        }
        Ok(())
    }
}

fn report_error(err: &mut impl Write, e: &PlayerError) -> io::Result<()> {
    error!("{} ❌ {}", log_ctx(), e);
    match e {
        PlayerError::NoVideoStreamPlayable(report) => {
            writeln!(err, "错误: {}", e)?;
            write!(err, "{}", report)
        }
        _ => writeln!(err, "错误: {}", e),
    }
}
