// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX Runtime 检测器

use anyhow::{Context, Result};
use image::RgbImage;
use log::{debug, info};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::time::Instant;

use super::yolo::{decode_output, preprocess};
use super::Detector;
use crate::detection::Detection;

pub struct OnnxDetector {
    session: Session,
    input_name: String,
    output_name: String,
    names: Vec<String>,
    conf: f32,
    iou: f32,
}

impl OnnxDetector {
    pub fn new(model: &Path, names: Vec<String>, conf: f32, iou: f32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model)
            .with_context(|| format!("无法加载ONNX模型: {}", model.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("模型没有输入")?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .context("模型没有输出")?;
        info!("✅ 模型输入: {}, 输出: {}", input_name, output_name);

        Ok(Self {
            session,
            input_name,
            output_name,
            names,
            conf,
            iou,
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&mut self, frame: &RgbImage, inf_size: u32) -> Result<Vec<Detection>> {
        let t_pre = Instant::now();
        let input = Tensor::from_array(preprocess(frame, inf_size)?)?;

        let t_run = Instant::now();
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context("模型推理失败")?;
        let output: ndarray::ArrayViewD<f32> = outputs[self.output_name.as_str()]
            .try_extract_array()
            .context("无法读取模型输出")?;

        let t_post = Instant::now();
        let xs = decode_output(output, &self.names, self.conf, self.iou)?;
        debug!(
            "[Model] pre {:?} | run {:?} | post {:?} | {} 个目标",
            t_run - t_pre,
            t_post - t_run,
            t_post.elapsed(),
            xs.len()
        );
        Ok(xs)
    }
}
