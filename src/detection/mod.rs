// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测后处理系统 (Detection Postprocessor)
///
/// 单线程流水线, 每帧执行一次:
/// - rescale:        推理分辨率 → 采集分辨率
/// - filter_for_save: 尺寸/置信度过滤
/// - crop_and_persist: 裁剪并保存
/// - Session:        持有缩放系数与累计计数
pub mod postprocess;
pub mod session;
pub mod types;

pub use postprocess::{
    count_by_label, crop, crop_and_persist, crop_region, crop_regions, filter_for_save, rescale,
};
pub use session::{FpsMeter, Session, StepOutcome};
pub use types::{
    Crop, Detection, FrameReport, PersistReport, PixelRect, ScaleFactor, INF_SIZE, PERSON,
};
