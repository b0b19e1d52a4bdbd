use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;

mod app;
mod core;
mod player;
mod renderer;
mod shell;

use crate::app::PlayerWindow;
use crate::core::PlayerConfig;
use crate::player::{FfmpegBackend, PlaybackSession};
use crate::renderer::{EguiSurface, HeadlessSurface};
use crate::shell::{CommandShell, BANNER};

/// 命令行驱动的视频播放器
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 不创建窗口，只在终端中解码和计时
    #[arg(long)]
    headless: bool,

    /// 启动后立即加载的文件
    file: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        // 过滤掉 wgpu / eframe 的日志噪音
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Error)
        .filter_module("eframe", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    // 终止信号：直接退出，不等待解码线程
    ctrlc::set_handler(|| {
        println!("程序终止。");
        process::exit(0);
    })
    .map_err(|e| anyhow::anyhow!("无法注册信号处理: {}", e))?;

    // 初始化 FFmpeg
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("FFmpeg 初始化失败: {}", e))?;
    info!("✅ FFmpeg 初始化成功");

    let config = PlayerConfig::load(args.config.as_deref())?;
    println!("{}", BANNER);

    if args.headless {
        run_headless(config, args.file)
    } else {
        run_windowed(config, args.file)
    }
}

fn run_headless(config: PlayerConfig, file: Option<String>) -> Result<()> {
    info!("🖥️ 无窗口模式");
    let surface = Arc::new(HeadlessSurface::new());
    let mut session = PlaybackSession::new(FfmpegBackend, config, surface);
    preload(&mut session, file);

    CommandShell::new(session).run(io::stdin().lock(), io::stdout(), io::stderr())?;
    Ok(())
}

fn run_windowed(config: PlayerConfig, file: Option<String>) -> Result<()> {
    let surface = Arc::new(EguiSurface::new());
    let (event_tx, event_rx) = unbounded();

    let mut session = PlaybackSession::new(FfmpegBackend, config.clone(), surface.clone())
        .with_events(event_tx);
    preload(&mut session, file);

    // 命令行在独立线程中读取，窗口必须留在主线程
    thread::Builder::new()
        .name("shell".to_string())
        .spawn(move || {
            let mut shell = CommandShell::new(session);
            if let Err(e) = shell.run(io::stdin().lock(), io::stdout(), io::stderr()) {
                error!("❌ 命令行读取失败: {}", e);
            }
            drop(shell);
            process::exit(0);
        })?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.output_width as f32, config.output_height as f32])
            .with_title(&config.window_title),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };

    eframe::run_native(
        &config.window_title,
        options,
        Box::new(move |cc| Box::new(PlayerWindow::new(cc, surface, event_rx))),
    )
    .map_err(|e| anyhow::anyhow!("窗口启动失败: {}", e))?;

    Ok(())
}

/// 命令行参数中的文件直接加载，不经过分词
fn preload(session: &mut PlaybackSession<FfmpegBackend>, file: Option<String>) {
    let Some(path) = file else {
        return;
    };
    match session.load(&path) {
        Ok(report) => print!("{}", report),
        Err(e) => {
            error!("❌ 加载失败: {}", e);
            eprintln!("错误: {}", e);
        }
    }
}
