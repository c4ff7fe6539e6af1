// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 目标裁剪器 (Miner)
///
/// 摄像头实时检测, 统计人数并按节奏保存高置信度的大目标裁剪图
///
/// 流程:
/// 1. 采集:   摄像头 1920x1080 (或图片目录回放)
/// 2. 推理:   缩放到 640x640 → 检测
/// 3. 后处理: 坐标还原 → 计数 → 过滤保存 → 画框标注
/// 4. 显示:   macroquad 窗口, 按 `q` 退出
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs;

use yolo_miner::config::{MinerArgs, SourceKind};
use yolo_miner::input::{DirectorySource, FrameSource};
use yolo_miner::models::load_detector;
use yolo_miner::renderer::display::{run_windowed, window_conf};
use yolo_miner::renderer::resolve_font;
use yolo_miner::{Annotator, Palette, Session};

#[cfg(feature = "ffmpeg")]
const CAPTURE_WIDTH: u32 = 1920;
#[cfg(feature = "ffmpeg")]
const CAPTURE_HEIGHT: u32 = 1080;

fn open_source(args: &MinerArgs) -> Result<Box<dyn FrameSource>> {
    match args.source {
        SourceKind::Dir => {
            let dir = args
                .input_dir
                .as_deref()
                .context("--source dir 需要 --input-dir")?;
            Ok(Box::new(DirectorySource::open(dir)?))
        }
        #[cfg(feature = "ffmpeg")]
        SourceKind::Camera => {
            let devices = yolo_miner::input::list_video_devices();
            for (i, name) in devices.iter().enumerate() {
                info!("  📷 [{}] {}", i, name);
            }
            Ok(Box::new(yolo_miner::input::CameraSource::open(
                args.device,
                CAPTURE_WIDTH,
                CAPTURE_HEIGHT,
            )?))
        }
        #[cfg(feature = "ffmpeg")]
        SourceKind::Desktop => Ok(Box::new(yolo_miner::input::DesktopSource::open())),
        #[cfg(not(feature = "ffmpeg"))]
        SourceKind::Camera | SourceKind::Desktop => {
            anyhow::bail!("摄像头/桌面采集需要启用 `ffmpeg` 特性, 或使用 --source dir")
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = MinerArgs::parse();
    let config = args.resolve();
    config.print_summary();

    if config.persist_every > 0 {
        fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("无法创建输出目录: {}", config.output_dir.display())
        })?;
    }

    info!("🚀 目标裁剪器启动");
    let mut detector = load_detector(
        &args.model,
        args.names.as_deref(),
        config.detector_conf,
        config.detector_iou,
    )?;
    let mut source = open_source(&args)?;

    let font = resolve_font(args.font.as_deref())?;

    let annotator = Annotator::new(Palette::miner()).with_font(font);
    let mut session = Session::new(config, annotator);

    if args.headless {
        let processed = session.run_headless(source.as_mut(), detector.as_mut(), args.max_frames);
        info!(
            "✅ 共处理 {} 帧, 累计 {} 个 {}",
            processed,
            session.running_total(),
            session.config().counted_label
        );
    } else {
        macroquad::Window::from_config(
            window_conf("Miner"),
            run_windowed(session, source, detector, args.max_frames),
        );
    }
    Ok(())
}
