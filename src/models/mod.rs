// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测器统一接口与实现
///
/// ## 实现
/// - **ReplayDetector**: 从 JSON Lines 文件回放预先计算的检测结果 (离线调试/测试)
/// - **OnnxDetector**: ONNX Runtime 推理 YOLOv5/YOLOv8 导出模型 (`onnx` 特性)
///
/// ## 核心流程
/// ```text
/// 原始帧 → resize(inf_size × inf_size) → NCHW张量
///        ↓
///   推理引擎 run
///        ↓
///   原始输出 → decode_output (置信度过滤 + NMS) → Vec<Detection>
/// ```
///
/// 检测器返回的坐标位于推理分辨率 (inf_size × inf_size) 下,
/// 由会话统一缩放回采集分辨率.
pub mod replay;
pub mod yolo;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use replay::ReplayDetector;
pub use yolo::{decode_output, preprocess, OutputLayout};

#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;

use anyhow::{bail, Context, Result};
use image::RgbImage;
use log::info;
use std::fs;
use std::path::Path;

use crate::detection::Detection;

/// 目标检测器
pub trait Detector {
    /// 检测一帧, 坐标位于 inf_size × inf_size 推理空间
    fn detect(&mut self, frame: &RgbImage, inf_size: u32) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &RgbImage, inf_size: u32) -> Result<Vec<Detection>> {
        (**self).detect(frame, inf_size)
    }
}

/// COCO 80 类名称 (YOLOv5/YOLOv8 预训练模型)
pub const COCO_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// 读取类名文件 (每行一个, 忽略空行); 未指定时使用 COCO 类名
pub fn load_names(path: Option<&Path>) -> Result<Vec<String>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("无法读取类名文件: {}", path.display()))?;
            let names: Vec<String> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect();
            if names.is_empty() {
                bail!("类名文件为空: {}", path.display());
            }
            Ok(names)
        }
        None => Ok(COCO_NAMES.iter().map(|s| s.to_string()).collect()),
    }
}

/// 按模型文件扩展名创建检测器
///
/// - `.jsonl` / `.json` → ReplayDetector
/// - `.onnx`            → OnnxDetector (需要 `onnx` 特性)
#[cfg_attr(not(feature = "onnx"), allow(unused_variables))]
pub fn load_detector(
    model: &Path,
    names: Option<&Path>,
    conf: f32,
    iou: f32,
) -> Result<Box<dyn Detector>> {
    let ext = model
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jsonl" | "json" => {
            info!("📼 回放检测结果: {}", model.display());
            Ok(Box::new(ReplayDetector::from_path(model)?))
        }
        #[cfg(feature = "onnx")]
        "onnx" => {
            let names = load_names(names)?;
            info!("🧠 加载ONNX模型: {} ({} 类)", model.display(), names.len());
            Ok(Box::new(OnnxDetector::new(model, names, conf, iou)?))
        }
        #[cfg(not(feature = "onnx"))]
        "onnx" => {
            bail!("ONNX 推理需要启用 `onnx` 特性: {}", model.display())
        }
        _ => bail!("不支持的模型文件: {}", model.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names_are_coco() {
        let names = load_names(None).unwrap();
        assert_eq!(names.len(), 80);
        assert_eq!(names[0], "person");
        assert_eq!(names[27], "tie");
    }

    #[test]
    fn test_names_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        fs::write(&path, "mask\n\nno-mask\n incorrect \n").unwrap();
        assert_eq!(load_names(Some(&path)).unwrap(), vec!["mask", "no-mask", "incorrect"]);

        fs::write(&path, "\n\n").unwrap();
        assert!(load_names(Some(&path)).is_err());
    }

    #[test]
    fn test_unknown_model_extension_is_rejected() {
        assert!(load_detector(Path::new("model.pt"), None, 0.25, 0.45).is_err());
    }

    #[test]
    fn test_replay_is_selected_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dets.jsonl");
        fs::write(&path, "[]\n").unwrap();
        let mut detector = load_detector(&path, None, 0.25, 0.45).unwrap();
        assert!(detector.detect(&RgbImage::new(8, 8), 640).unwrap().is_empty());
    }
}
