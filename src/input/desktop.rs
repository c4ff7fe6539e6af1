// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 桌面捕获模块
//!
//! Windows 使用 gdigrab, macOS 使用 avfoundation, 其余使用 x11grab

use image::RgbImage;
use log::info;
use std::time::Duration;

use super::decode_filter::CaptureStream;
use super::FrameSource;
use crate::error::PipelineError;

#[cfg(target_os = "windows")]
const DESKTOP: (&str, &str) = ("gdigrab", "desktop");
#[cfg(target_os = "macos")]
const DESKTOP: (&str, &str) = ("avfoundation", "Capture screen 0");
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DESKTOP: (&str, &str) = ("x11grab", ":0.0");

pub struct DesktopSource {
    stream: CaptureStream,
}

impl DesktopSource {
    /// 捕获整个主屏幕
    pub fn open() -> Self {
        let (format, input) = DESKTOP;
        let input = std::env::var("DISPLAY")
            .ok()
            .filter(|_| format == "x11grab")
            .unwrap_or_else(|| input.to_string());
        info!("🖥️ 启动桌面捕获: {} {}", format, input);

        Self {
            stream: CaptureStream::spawn(
                format,
                &input,
                vec![("framerate", "30".to_string())],
                Duration::from_secs(5),
            ),
        }
    }
}

impl FrameSource for DesktopSource {
    fn next_frame(&mut self) -> Result<RgbImage, PipelineError> {
        self.stream.recv()
    }
}
