// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 帧源系统 (Frame Source System)
///
/// - DirectorySource: 图片目录回放
/// - RegionSource:    固定区域裁剪 (包装任意帧源)
/// - CameraSource:    本地摄像头 (DirectShow/AVFoundation/V4L2, ffmpeg 特性)
/// - DesktopSource:   桌面截屏 (gdigrab/x11grab/avfoundation, ffmpeg 特性)
pub mod convert;
pub mod directory;
pub mod region;

#[cfg(feature = "ffmpeg")]
pub mod camera;
#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod desktop;

pub use directory::DirectorySource;
pub use region::{RegionSource, ScreenRegion};

#[cfg(feature = "ffmpeg")]
pub use camera::{list_video_devices, CameraSource};
#[cfg(feature = "ffmpeg")]
pub use desktop::DesktopSource;

use image::RgbImage;

use crate::error::PipelineError;

/// 按需产生帧
///
/// `CaptureFailure` 表示本次没有帧 (跳过), `SourceClosed` 表示帧源结束.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<RgbImage, PipelineError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<RgbImage, PipelineError> {
        (**self).next_frame()
    }
}
