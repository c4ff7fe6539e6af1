// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 图片目录帧源 - 按文件名顺序回放

use anyhow::{Context, Result};
use image::RgbImage;
use log::info;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use super::FrameSource;
use crate::error::PipelineError;

const EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

pub struct DirectorySource {
    files: VecDeque<PathBuf>,
}

impl DirectorySource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("无法读取图片目录: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        info!("🖼️ 图片目录: {} ({} 张)", dir.display(), files.len());
        Ok(Self {
            files: files.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<RgbImage, PipelineError> {
        let path = self.files.pop_front().ok_or(PipelineError::SourceClosed)?;
        image::open(&path)
            .map(|img| img.to_rgb8())
            .map_err(|e| PipelineError::CaptureFailure(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_sorted_images_then_closes() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(4, 2).save(dir.path().join("b.png")).unwrap();
        RgbImage::new(2, 2).save(dir.path().join("a.png")).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        fs::write(dir.path().join("c.jpg"), "not an image").unwrap();

        let mut source = DirectorySource::open(dir.path()).unwrap();
        assert_eq!(source.remaining(), 3);
        assert_eq!(source.next_frame().unwrap().dimensions(), (2, 2));
        assert_eq!(source.next_frame().unwrap().dimensions(), (4, 2));
        assert!(matches!(
            source.next_frame(),
            Err(PipelineError::CaptureFailure(_))
        ));
        assert!(matches!(source.next_frame(), Err(PipelineError::SourceClosed)));
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        assert!(DirectorySource::open(Path::new("/definitely/not/here")).is_err());
    }
}
