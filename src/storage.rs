// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 裁剪图落盘
//!
//! 文件名格式 `<label>_<epoch-millis>.jpg`, 按时间排序即按文件名排序.
//! 输出目录由调用方保证存在.

use image::ImageFormat;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::detection::{Crop, PersistReport};
use crate::error::PipelineError;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// 类别名 → 文件名安全字符串 (`traffic light` → `traffic_light`)
pub fn sanitize_label(label: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(label.trim(), "_");
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.into_owned()
    }
}

pub fn crop_file_name(label: &str, millis: i64) -> String {
    format!("{}_{}.jpg", sanitize_label(label), millis)
}

/// 裁剪图写入器
#[derive(Clone, Debug)]
pub struct CropWriter {
    dir: PathBuf,
}

impl CropWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入单个裁剪图
    ///
    /// 同一毫秒内同名文件已存在时顺延时间戳, 保证唯一且仍可按时间排序.
    pub fn persist(&self, crop: &Crop, millis: i64) -> Result<PathBuf, PipelineError> {
        let mut stamp = millis;
        let mut path = self.dir.join(crop_file_name(&crop.label, stamp));
        while path.exists() {
            stamp += 1;
            path = self.dir.join(crop_file_name(&crop.label, stamp));
        }

        crop.image
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|source| PipelineError::PersistenceFailure {
                path: path.clone(),
                source,
            })?;
        debug!(
            "💾 保存裁剪图: {} ({}x{})",
            path.display(),
            crop.rect.width,
            crop.rect.height
        );
        Ok(path)
    }

    /// 批量写入, 任何单个失败 (空区域 / 写盘错误) 只跳过该项
    pub fn persist_batch<I>(&self, crops: I, millis: i64) -> PersistReport
    where
        I: IntoIterator<Item = Result<Crop, PipelineError>>,
    {
        let mut report = PersistReport::default();
        for crop in crops {
            match crop.and_then(|c| self.persist(&c, millis)) {
                Ok(path) => report.written.push(path),
                Err(e) => {
                    warn!("⚠️ 跳过检测框: {}", e);
                    report.skipped += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::PixelRect;
    use image::RgbImage;

    fn crop(label: &str, w: u32, h: u32) -> Crop {
        Crop {
            label: label.to_string(),
            rect: PixelRect { x: 0, y: 0, width: w, height: h },
            image: RgbImage::new(w, h),
        }
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("person"), "person");
        assert_eq!(sanitize_label("traffic light"), "traffic_light");
        assert_eq!(sanitize_label("../etc"), "___etc");
        assert_eq!(sanitize_label(""), "unknown");
    }

    #[test]
    fn test_file_name_pattern() {
        assert_eq!(crop_file_name("person", 1700000000123), "person_1700000000123.jpg");
    }

    #[test]
    fn test_same_millis_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CropWriter::new(dir.path());
        let a = writer.persist(&crop("person", 8, 8), 42).unwrap();
        let b = writer.persist(&crop("person", 8, 8), 42).unwrap();
        assert_eq!(a.file_name().unwrap(), "person_42.jpg");
        assert_eq!(b.file_name().unwrap(), "person_43.jpg");
    }

    #[test]
    fn test_write_failure_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CropWriter::new(dir.path().join("missing"));
        let report = writer.persist_batch(vec![Ok(crop("person", 8, 8))], 1);
        assert!(report.written.is_empty());
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CropWriter::new(dir.path());
        let batch = vec![
            Err(PipelineError::DegenerateCrop {
                label: "tie".to_string(),
                width: 0,
                height: 3,
            }),
            Ok(crop("person", 10, 10)),
        ];
        let report = writer.persist_batch(batch, 7);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.written.len(), 1);
        assert!(report.written[0].exists());
    }
}
