// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 屏幕检测预览 (Screen)
///
/// 整屏截图或固定区域 (小地图) 检测, 只显示标注画面, 不保存裁剪图
use anyhow::Result;
use clap::Parser;
use log::info;

use yolo_miner::config::ScreenArgs;
use yolo_miner::input::{DirectorySource, FrameSource, RegionSource};
use yolo_miner::models::load_detector;
use yolo_miner::renderer::display::{run_windowed, window_conf};
use yolo_miner::renderer::resolve_font;
use yolo_miner::{Annotator, Palette, Session};

fn open_source(args: &ScreenArgs) -> Result<Box<dyn FrameSource>> {
    if let Some(dir) = &args.input_dir {
        let source = DirectorySource::open(dir)?;
        return Ok(match args.detect.region() {
            Some(region) => Box::new(RegionSource::new(source, region)),
            None => Box::new(source),
        });
    }

    #[cfg(feature = "ffmpeg")]
    {
        let source = yolo_miner::input::DesktopSource::open();
        Ok(match args.detect.region() {
            Some(region) => Box::new(RegionSource::new(source, region)),
            None => Box::new(source),
        })
    }
    #[cfg(not(feature = "ffmpeg"))]
    {
        anyhow::bail!("桌面截屏需要启用 `ffmpeg` 特性, 或使用 --input-dir")
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ScreenArgs::parse();
    let config = args.resolve();
    info!("🖥️ 屏幕检测: {:?}, 模型 {}", args.detect, args.model.display());

    let mut detector = load_detector(
        &args.model,
        args.names.as_deref(),
        config.detector_conf,
        config.detector_iou,
    )?;
    let mut source = open_source(&args)?;

    let font = resolve_font(args.font.as_deref())?;

    let annotator = Annotator::new(Palette::screen())
        .with_font(font)
        .with_thickness(5)
        .with_overlay(false);
    let mut session = Session::new(config, annotator);

    if args.headless {
        let processed = session.run_headless(source.as_mut(), detector.as_mut(), args.max_frames);
        info!("✅ 共处理 {} 帧", processed);
    } else {
        macroquad::Window::from_config(
            window_conf("Screen Detection"),
            run_windowed(session, source, detector, args.max_frames),
        );
    }
    Ok(())
}
