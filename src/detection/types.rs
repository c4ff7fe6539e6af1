// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测系统数据结构定义
/// Data structures for the detection postprocessor
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ========== 公共常量 ==========

/// 推理输入尺寸 (YOLOv5 默认 640x640)
pub const INF_SIZE: u32 = 640;

/// 默认计数类别
pub const PERSON: &str = "person";

// ========== 数据结构 ==========

/// 检测框 (Detection bounding box)
///
/// 坐标位于推理分辨率空间 (inference-resolution pixels), 经 [`rescale`](super::rescale)
/// 后位于采集分辨率空间.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(alias = "name")]
    pub label: String,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        label: impl Into<String>,
        xmin: f32,
        ymin: f32,
        xmax: f32,
        ymax: f32,
        confidence: f32,
    ) -> Self {
        Self {
            label: label.into(),
            xmin,
            ymin,
            xmax,
            ymax,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.) * self.height().max(0.)
    }

    pub fn iou(&self, another: &Detection) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = self.xmax.min(another.xmax);
        let t = self.ymin.max(another.ymin);
        let b = self.ymax.min(another.ymax);
        let inter = (r - l).max(0.) * (b - t).max(0.);
        let union = self.area() + another.area() - inter;
        if union <= 0. {
            return 0.;
        }
        inter / union
    }
}

/// 缩放系数: 采集分辨率 / 推理分辨率
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactor {
    pub x: f32,
    pub y: f32,
}

impl ScaleFactor {
    pub const IDENTITY: ScaleFactor = ScaleFactor { x: 1.0, y: 1.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 由首帧尺寸计算
    pub fn from_dims(width: u32, height: u32, inf_size: u32) -> Self {
        Self {
            x: width as f32 / inf_size as f32,
            y: height as f32 / inf_size as f32,
        }
    }
}

/// 整数裁剪区域 (已截断并限制在帧范围内)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 待保存的裁剪图
#[derive(Clone, Debug)]
pub struct Crop {
    pub label: String,
    pub rect: PixelRect,
    pub image: RgbImage,
}

/// 裁剪保存统计
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersistReport {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// 单帧处理结果 (Session → 调用方)
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub frame_index: u64,
    pub detections: Vec<Detection>, // 已缩放到采集分辨率
    pub label_count: usize,   // 本帧计数类别数量 (全部检测框)
    pub running_total: u64,   // 累计数量 (仅达到保存阈值的检测框)
    pub persisted: bool,
    pub persist: PersistReport,
    pub annotated: Option<RgbImage>,
}
