// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测会话 (Detection Session)
//! 职责: 持有缩放系数(只计算一次)与累计计数, 串起单帧流水线
//!
//! 采集 → 推理 → 缩放 → 过滤/保存 → 标注

use image::RgbImage;
use log::{debug, info, warn};
use std::time::Instant;

use super::postprocess::{count_by_label, crop_regions, filter_for_save, rescale};
use super::types::{Detection, FrameReport, PersistReport, ScaleFactor};
use crate::config::MinerConfig;
use crate::error::PipelineError;
use crate::input::FrameSource;
use crate::models::Detector;
use crate::renderer::Annotator;
use crate::storage::CropWriter;

/// 单次迭代结果
#[derive(Debug)]
pub enum StepOutcome {
    Processed(FrameReport),
    /// 采集或推理失败, 跳过本帧
    Skipped,
    /// 帧源结束
    Finished,
}

/// 每秒统计一次帧率
#[derive(Debug)]
pub struct FpsMeter {
    count: u64,
    last: Instant,
    current_fps: f64,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self {
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
        }
    }
}

impl FpsMeter {
    /// 记一帧, 满一秒时返回新的帧率
    pub fn tick(&mut self) -> Option<f64> {
        self.count += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        if elapsed >= 1.0 {
            self.current_fps = self.count as f64 / elapsed;
            self.count = 0;
            self.last = now;
            return Some(self.current_fps);
        }
        None
    }

    pub fn fps(&self) -> f64 {
        self.current_fps
    }
}

pub struct Session {
    config: MinerConfig,
    annotator: Annotator,
    writer: CropWriter,
    scale: Option<ScaleFactor>,
    running_total: u64,
    frame_index: u64,
    fps: FpsMeter,
}

impl Session {
    pub fn new(config: MinerConfig, annotator: Annotator) -> Self {
        let writer = CropWriter::new(config.output_dir.clone());
        let annotator = annotator.with_counted_label(config.counted_label.clone());
        Self {
            config,
            annotator,
            writer,
            scale: None,
            running_total: 0,
            frame_index: 1,
            fps: FpsMeter::default(),
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// 首帧之前为 None
    pub fn scale(&self) -> Option<ScaleFactor> {
        self.scale
    }

    pub fn running_total(&self) -> u64 {
        self.running_total
    }

    /// 下一帧的序号 (从1开始)
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    fn ensure_scale(&mut self, width: u32, height: u32) -> ScaleFactor {
        let inf_size = self.config.inf_size;
        *self.scale.get_or_insert_with(|| {
            let scale = ScaleFactor::from_dims(width, height, inf_size);
            info!(
                "📐 缩放系数: {:.3} x {:.3} ({}x{} → {})",
                scale.x, scale.y, width, height, inf_size
            );
            scale
        })
    }

    fn on_cadence(index: u64, every: u64) -> bool {
        every != 0 && index % every == 0
    }

    /// 处理一帧检测结果 (推理分辨率坐标)
    pub fn process(
        &mut self,
        frame: &RgbImage,
        detections: &[Detection],
        now_millis: i64,
    ) -> FrameReport {
        let index = self.frame_index;
        self.frame_index += 1;

        let scale = self.ensure_scale(frame.width(), frame.height());
        let scaled = rescale(detections, scale);

        for d in &scaled {
            debug!(
                "  {:>8.1} {:>8.1} {:>8.1} {:>8.1}  {:.3}  {}",
                d.xmin, d.ymin, d.xmax, d.ymax, d.confidence, d.label
            );
        }

        let label_count = count_by_label(&scaled, &self.config.counted_label);
        let keep = filter_for_save(&scaled, self.config.min_size, self.config.min_confidence);

        // 只累计达到保存阈值的目标
        let qualified = count_by_label(&keep, &self.config.counted_label);
        if qualified > 0 {
            info!("# People: {}", qualified);
            self.running_total += qualified as u64;
        }

        let persisted = Self::on_cadence(index, self.config.persist_every);
        let persist = if persisted {
            self.writer
                .persist_batch(crop_regions(frame, &keep), now_millis)
        } else {
            PersistReport::default()
        };

        let annotated = if Self::on_cadence(index, self.config.render_every) {
            Some(self.annotator.annotate(frame, &scaled, self.running_total))
        } else {
            None
        };

        if let Some(fps) = self.fps.tick() {
            info!("{:.1} fps", fps);
        }

        FrameReport {
            frame_index: index,
            detections: scaled,
            label_count,
            running_total: self.running_total,
            persisted,
            persist,
            annotated,
        }
    }

    /// 完整执行一次迭代
    pub fn step<S, D>(&mut self, source: &mut S, detector: &mut D) -> StepOutcome
    where
        S: FrameSource + ?Sized,
        D: Detector + ?Sized,
    {
        debug!("[{}] New Inference Iteration", chrono::Local::now());

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) if !e.is_recoverable() => return StepOutcome::Finished,
            Err(e) => {
                warn!("⚠️ 跳过本帧: {}", e);
                return StepOutcome::Skipped;
            }
        };

        let detections = match detector.detect(&frame, self.config.inf_size) {
            Ok(xs) => xs,
            Err(e) => {
                warn!("⚠️ 跳过本帧: {}", PipelineError::Detector(e));
                return StepOutcome::Skipped;
            }
        };

        StepOutcome::Processed(self.process(&frame, &detections, crate::epoch_millis()))
    }

    /// 无窗口主循环, 返回处理帧数
    pub fn run_headless<S, D>(
        &mut self,
        source: &mut S,
        detector: &mut D,
        max_frames: Option<u64>,
    ) -> u64
    where
        S: FrameSource + ?Sized,
        D: Detector + ?Sized,
    {
        let mut processed = 0u64;
        loop {
            match self.step(source, detector) {
                StepOutcome::Processed(_) => processed += 1,
                StepOutcome::Skipped => {}
                StepOutcome::Finished => break,
            }
            if max_frames.is_some_and(|max| processed >= max) {
                break;
            }
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Palette;

    fn session(dir: &std::path::Path, config: MinerConfig) -> Session {
        let config = MinerConfig {
            output_dir: dir.to_path_buf(),
            ..config
        };
        Session::new(config, Annotator::new(Palette::miner()))
    }

    #[test]
    fn test_scale_is_computed_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), MinerConfig::default());
        assert_eq!(s.scale(), None);

        s.process(&RgbImage::new(1280, 640), &[], 0);
        assert_eq!(s.scale(), Some(ScaleFactor::new(2.0, 1.0)));

        let report = s.process(
            &RgbImage::new(640, 640),
            &[Detection::new("tie", 10., 10., 20., 20., 0.9)],
            0,
        );
        assert_eq!(s.scale(), Some(ScaleFactor::new(2.0, 1.0)));
        assert_eq!(report.detections[0].xmin, 20.);
    }

    #[test]
    fn test_counter_accumulates_qualifying_detections() {
        let dir = tempfile::tempdir().unwrap();
        let config = MinerConfig {
            persist_every: 0,
            render_every: 0,
            ..MinerConfig::default()
        };
        let mut s = session(dir.path(), config);
        let frame = RgbImage::new(640, 640);
        let xs = vec![
            Detection::new("person", 0., 0., 200., 200., 0.9),
            Detection::new("person", 300., 300., 500., 500., 0.8),
            Detection::new("person", 0., 0., 200., 200., 0.3),
            Detection::new("person", 0., 0., 50., 50., 0.9),
            Detection::new("tie", 0., 0., 200., 200., 0.9),
        ];
        let first = s.process(&frame, &xs, 0);
        assert_eq!(first.label_count, 4);
        assert_eq!(first.running_total, 2);
        assert_eq!(s.process(&frame, &xs, 0).running_total, 4);
        assert_eq!(s.process(&frame, &[], 0).running_total, 4);
    }

    #[test]
    fn test_cadences_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let config = MinerConfig {
            persist_every: 2,
            render_every: 3,
            ..MinerConfig::default()
        };
        let mut s = session(dir.path(), config);
        let frame = RgbImage::new(64, 64);

        let flags: Vec<(bool, bool)> = (0..6)
            .map(|_| {
                let r = s.process(&frame, &[], 0);
                (r.persisted, r.annotated.is_some())
            })
            .collect();
        assert_eq!(
            flags,
            vec![
                (false, false),
                (true, false),
                (false, true),
                (true, false),
                (false, false),
                (true, true),
            ]
        );
    }

    #[test]
    fn test_fps_meter_waits_a_second() {
        let mut meter = FpsMeter::default();
        assert_eq!(meter.tick(), None);
        assert_eq!(meter.fps(), 0.0);
    }
}
