// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 阈值/节奏配置 + 命令行参数
pub mod detection; // 检测后处理 + 会话状态
pub mod error; // 流水线错误分类
pub mod input; // 帧源 (目录 / 摄像头 / 桌面)
pub mod models; // 检测器接口与具体实现
pub mod renderer; // 画框标注 + 窗口显示
pub mod storage; // 裁剪图落盘

pub use crate::config::MinerConfig;
pub use crate::detection::{
    count_by_label, crop_and_persist, filter_for_save, rescale, Detection, FrameReport,
    ScaleFactor, Session, StepOutcome,
};
pub use crate::error::PipelineError;
pub use crate::input::FrameSource;
pub use crate::models::Detector;
pub use crate::renderer::{Annotator, Palette};
pub use crate::storage::CropWriter;

/// 同类别非极大值抑制 (按置信度降序贪心保留)
pub fn non_max_suppression(xs: &mut Vec<Detection>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence.total_cmp(&b1.confidence));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            if xs[prev_index].label != xs[index].label {
                continue;
            }
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

/// 当前 Unix 时间戳 (毫秒), 用于裁剪图文件名
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_keeps_best_of_overlapping_boxes() {
        let mut xs = vec![
            Detection::new("person", 0., 0., 100., 100., 0.6),
            Detection::new("person", 5., 5., 105., 105., 0.9),
            Detection::new("person", 300., 300., 400., 400., 0.5),
        ];
        non_max_suppression(&mut xs, 0.45);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].confidence, 0.9);
        assert_eq!(xs[1].xmin, 300.);
    }

    #[test]
    fn nms_is_class_aware() {
        let mut xs = vec![
            Detection::new("person", 0., 0., 100., 100., 0.9),
            Detection::new("tie", 0., 0., 100., 100., 0.8),
        ];
        non_max_suppression(&mut xs, 0.45);
        assert_eq!(xs.len(), 2);
    }
}
