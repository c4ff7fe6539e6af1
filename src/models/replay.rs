// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测结果回放
//!
//! 文件每行一个 JSON 数组, 对应一帧的检测列表:
//! `[{"name":"person","xmin":100,"ymin":100,"xmax":300,"ymax":300,"confidence":0.9}]`
//! 回放完毕后每帧返回空列表.

use anyhow::{Context, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use super::Detector;
use crate::detection::Detection;

#[derive(Debug, Default)]
pub struct ReplayDetector {
    frames: VecDeque<Vec<Detection>>,
}

impl ReplayDetector {
    pub fn from_frames(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("无法读取回放文件: {}", path.display()))?;
        let mut frames = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame: Vec<Detection> = serde_json::from_str(line)
                .with_context(|| format!("{}:{} 解析失败", path.display(), lineno + 1))?;
            frames.push(frame);
        }
        Ok(Self::from_frames(frames))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, _frame: &RgbImage, _inf_size: u32) -> Result<Vec<Detection>> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dets.jsonl");
        fs::write(
            &path,
            concat!(
                r#"[{"name":"person","xmin":1,"ymin":2,"xmax":3,"ymax":4,"confidence":0.9}]"#,
                "\n\n",
                r#"[{"label":"tie","xmin":0,"ymin":0,"xmax":5,"ymax":5,"confidence":0.4},"#,
                r#"{"name":"person","xmin":0,"ymin":0,"xmax":5,"ymax":5,"confidence":0.8}]"#,
                "\n",
            ),
        )
        .unwrap();

        let mut detector = ReplayDetector::from_path(&path).unwrap();
        assert_eq!(detector.remaining(), 2);

        let frame = RgbImage::new(4, 4);
        let first = detector.detect(&frame, 640).unwrap();
        assert_eq!(first, vec![Detection::new("person", 1., 2., 3., 4., 0.9)]);

        let second = detector.detect(&frame, 640).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].label, "tie");

        assert!(detector.detect(&frame, 640).unwrap().is_empty());
    }

    #[test]
    fn test_bad_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dets.jsonl");
        fs::write(&path, "[]\nnot json\n").unwrap();
        let err = ReplayDetector::from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains(":2"));
    }
}
