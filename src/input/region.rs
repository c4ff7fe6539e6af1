// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 固定区域帧源

use image::{imageops, RgbImage};

use super::FrameSource;
use crate::error::PipelineError;

/// 屏幕区域 (left, top, right, bottom), 右/下边界不含
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl ScreenRegion {
    /// 2560x1440 屏幕右下角小地图, 四边各内缩100像素
    pub const LEAGUE_MINIMAP: ScreenRegion = ScreenRegion {
        left: 2140 + 100,
        top: 1030 + 100,
        right: 2560 - 100,
        bottom: 1440 - 100,
    };

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// 裁剪, 区域超出帧范围时报采集失败
    pub fn apply(&self, frame: &RgbImage) -> Result<RgbImage, PipelineError> {
        if self.width() == 0
            || self.height() == 0
            || self.right > frame.width()
            || self.bottom > frame.height()
        {
            return Err(PipelineError::CaptureFailure(format!(
                "region {:?} outside {}x{} frame",
                self, frame.width(), frame.height()
            )));
        }
        Ok(imageops::crop_imm(frame, self.left, self.top, self.width(), self.height()).to_image())
    }
}

/// 包装帧源, 只保留指定区域
pub struct RegionSource<S> {
    inner: S,
    region: ScreenRegion,
}

impl<S: FrameSource> RegionSource<S> {
    pub fn new(inner: S, region: ScreenRegion) -> Self {
        Self { inner, region }
    }
}

impl<S: FrameSource> FrameSource for RegionSource<S> {
    fn next_frame(&mut self) -> Result<RgbImage, PipelineError> {
        let frame = self.inner.next_frame()?;
        self.region.apply(&frame)
    }
}
