// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 流水线错误分类
//!
//! 所有错误都在本地恢复: 采集失败跳过当前帧, 裁剪/保存失败只跳过单个检测框.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// 帧源本次未产生图像
    #[error("capture failed: {0}")]
    CaptureFailure(String),

    /// 帧源已结束 (目录读完 / 设备关闭)
    #[error("frame source closed")]
    SourceClosed,

    /// 裁剪区域为空或越界
    #[error("degenerate crop for `{label}`: {width}x{height}")]
    DegenerateCrop {
        label: String,
        width: u32,
        height: u32,
    },

    /// 裁剪图写盘失败
    #[error("failed to write {}: {source}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 检测器推理失败
    #[error("detector failed: {0}")]
    Detector(#[from] anyhow::Error),
}

impl PipelineError {
    /// 是否仅需跳过当前迭代
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PipelineError::SourceClosed)
    }
}
