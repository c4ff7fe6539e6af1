// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 检测框后处理: 缩放 / 过滤 / 计数 / 裁剪

use image::{imageops, RgbImage};
use std::path::Path;

use super::types::{Crop, Detection, PersistReport, PixelRect, ScaleFactor};
use crate::error::PipelineError;
use crate::storage::CropWriter;

/// 坐标缩放: 每个 x 乘以 `scale.x`, 每个 y 乘以 `scale.y`
pub fn rescale(detections: &[Detection], scale: ScaleFactor) -> Vec<Detection> {
    detections
        .iter()
        .map(|d| Detection {
            label: d.label.clone(),
            xmin: d.xmin * scale.x,
            ymin: d.ymin * scale.y,
            xmax: d.xmax * scale.x,
            ymax: d.ymax * scale.y,
            confidence: d.confidence,
        })
        .collect()
}

/// 保存过滤: 宽、高都大于 `min_size` 且置信度大于 `min_confidence` (严格大于)
pub fn filter_for_save(
    detections: &[Detection],
    min_size: f32,
    min_confidence: f32,
) -> Vec<Detection> {
    detections
        .iter()
        .filter(|d| {
            d.width() > min_size && d.height() > min_size && d.confidence > min_confidence
        })
        .cloned()
        .collect()
}

pub fn count_by_label(detections: &[Detection], label: &str) -> usize {
    detections.iter().filter(|d| d.label == label).count()
}

/// 检测框 → 整数像素区域 (截断取整, 限制在帧范围内)
pub fn crop_region(frame_width: u32, frame_height: u32, detection: &Detection) -> PixelRect {
    let clamp = |v: f32, max: u32| -> u32 { (v as i64).clamp(0, max as i64) as u32 };

    let x1 = clamp(detection.xmin, frame_width);
    let x2 = clamp(detection.xmax, frame_width);
    let y1 = clamp(detection.ymin, frame_height);
    let y2 = clamp(detection.ymax, frame_height);

    PixelRect {
        x: x1,
        y: y1,
        width: x2.saturating_sub(x1),
        height: y2.saturating_sub(y1),
    }
}

/// 裁剪单个检测框 `frame[ymin:ymax, xmin:xmax]`
pub fn crop(frame: &RgbImage, detection: &Detection) -> Result<Crop, PipelineError> {
    let rect = crop_region(frame.width(), frame.height(), detection);
    if rect.is_empty() {
        return Err(PipelineError::DegenerateCrop {
            label: detection.label.clone(),
            width: rect.width,
            height: rect.height,
        });
    }

    let image = imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image();
    Ok(Crop {
        label: detection.label.clone(),
        rect,
        image,
    })
}

pub fn crop_regions(
    frame: &RgbImage,
    detections: &[Detection],
) -> Vec<Result<Crop, PipelineError>> {
    detections.iter().map(|d| crop(frame, d)).collect()
}

/// 裁剪并保存到 `output_dir`, 单个失败只跳过该检测框
pub fn crop_and_persist(
    frame: &RgbImage,
    detections: &[Detection],
    output_dir: &Path,
) -> PersistReport {
    CropWriter::new(output_dir).persist_batch(crop_regions(frame, detections), crate::epoch_millis())
}
