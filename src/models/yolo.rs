// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLO 预处理与输出解码
// 支持 YOLOv5 ([1, N, 5+nc], 含objectness) 与 YOLOv8 ([1, 4+nc, N]) 两种导出格式

use anyhow::{bail, Result};
use fast_image_resize as fr;
use image::RgbImage;
use ndarray::{s, Array4, ArrayView1, ArrayViewD, Axis, Ix3};

use crate::detection::Detection;
use crate::non_max_suppression;

/// 模型输出布局
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLayout {
    /// 每行: cx, cy, w, h, obj, cls...
    V5 { nc: usize },
    /// 每列: cx, cy, w, h, cls...
    V8 { nc: usize },
}

impl OutputLayout {
    /// 由输出形状 [rows, cols] 和类别数推断布局; 类别数对不上时按长边为候选框数
    pub fn infer(rows: usize, cols: usize, nc: usize) -> Result<Self> {
        if cols == nc + 5 {
            Ok(Self::V5 { nc })
        } else if rows == nc + 4 {
            Ok(Self::V8 { nc })
        } else if rows < cols && rows > 4 {
            Ok(Self::V8 { nc: rows - 4 })
        } else if cols > 5 {
            Ok(Self::V5 { nc: cols - 5 })
        } else {
            bail!("无法识别的输出形状 [1, {}, {}]", rows, cols)
        }
    }
}

/// 帧 → [1, 3, inf, inf] 的 0~1 浮点张量 (拉伸缩放, 不保持宽高比)
pub fn preprocess(frame: &RgbImage, inf_size: u32) -> Result<Array4<f32>> {
    let src = fr::images::ImageRef::new(
        frame.width(),
        frame.height(),
        frame.as_raw(),
        fr::PixelType::U8x3,
    )?;
    let mut dst = fr::images::Image::new(inf_size, inf_size, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer.resize(
        &src,
        &mut dst,
        &fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
    )?;

    let side = inf_size as usize;
    let mut xs = Array4::<f32>::zeros((1, 3, side, side));
    for (i, rgb) in dst.buffer().chunks_exact(3).enumerate() {
        let (y, x) = (i / side, i % side);
        xs[[0, 0, y, x]] = rgb[0] as f32 / 255.0;
        xs[[0, 1, y, x]] = rgb[1] as f32 / 255.0;
        xs[[0, 2, y, x]] = rgb[2] as f32 / 255.0;
    }
    Ok(xs)
}

fn class_name(names: &[String], id: usize) -> String {
    names
        .get(id)
        .cloned()
        .unwrap_or_else(|| format!("class{}", id))
}

fn best_class(clss: ArrayView1<f32>) -> Option<(usize, f32)> {
    clss.iter()
        .copied()
        .enumerate()
        .reduce(|max, x| if x.1 > max.1 { x } else { max })
}

fn cxcywh(label: String, pred: ArrayView1<f32>, confidence: f32) -> Detection {
    let (cx, cy, w, h) = (pred[0], pred[1], pred[2], pred[3]);
    Detection::new(
        label,
        cx - w / 2.,
        cy - h / 2.,
        cx + w / 2.,
        cy + h / 2.,
        confidence,
    )
}

/// 模型原始输出 → 检测框 (推理空间坐标)
pub fn decode_output(
    output: ArrayViewD<f32>,
    names: &[String],
    conf: f32,
    iou: f32,
) -> Result<Vec<Detection>> {
    let output = output.into_dimensionality::<Ix3>()?;
    if output.shape()[0] != 1 {
        bail!("仅支持 batch=1, 实际 {}", output.shape()[0]);
    }
    let preds = output.index_axis_move(Axis(0), 0);
    let (rows, cols) = preds.dim();

    let mut xs = Vec::new();
    match OutputLayout::infer(rows, cols, names.len())? {
        OutputLayout::V5 { nc } => {
            for pred in preds.axis_iter(Axis(0)) {
                let obj = pred[4];
                if obj < conf {
                    continue;
                }
                let Some((id, cls)) = best_class(pred.slice(s![5..5 + nc])) else {
                    continue;
                };
                let confidence = obj * cls;
                if confidence < conf {
                    continue;
                }
                xs.push(cxcywh(class_name(names, id), pred, confidence));
            }
        }
        OutputLayout::V8 { nc } => {
            for pred in preds.axis_iter(Axis(1)) {
                let Some((id, confidence)) = best_class(pred.slice(s![4..4 + nc])) else {
                    continue;
                };
                if confidence < conf {
                    continue;
                }
                xs.push(cxcywh(class_name(names, id), pred, confidence));
            }
        }
    }

    non_max_suppression(&mut xs, iou);
    Ok(xs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn names() -> Vec<String> {
        vec!["person".to_string(), "tie".to_string()]
    }

    #[test]
    fn test_infer_layout() {
        assert_eq!(OutputLayout::infer(25200, 85, 80).unwrap(), OutputLayout::V5 { nc: 80 });
        assert_eq!(OutputLayout::infer(84, 8400, 80).unwrap(), OutputLayout::V8 { nc: 80 });
        // 类名数量与模型不符
        assert_eq!(OutputLayout::infer(7, 8400, 80).unwrap(), OutputLayout::V8 { nc: 3 });
        assert_eq!(OutputLayout::infer(100, 8, 80).unwrap(), OutputLayout::V5 { nc: 3 });
        assert!(OutputLayout::infer(3, 2, 80).is_err());
    }

    #[test]
    fn test_decode_v5_applies_objectness_and_nms() {
        let out = Array3::from_shape_vec(
            (1, 3, 7),
            vec![
                100., 100., 40., 40., 0.9, 0.1, 0.9, // tie 0.81
                102., 100., 40., 40., 0.8, 0.2, 0.8, // tie 0.64, 与上一个重叠
                300., 300., 20., 60., 0.5, 0.6, 0.4, // person 0.30 < conf
            ],
        )
        .unwrap();
        let xs = decode_output(out.view().into_dyn(), &names(), 0.35, 0.45).unwrap();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].label, "tie");
        assert!((xs[0].confidence - 0.81).abs() < 1e-6);
        assert_eq!((xs[0].xmin, xs[0].ymin, xs[0].xmax, xs[0].ymax), (80., 80., 120., 120.));
    }

    #[test]
    fn test_decode_v8_reads_columns() {
        // [1, 4+2, 2]: 每列一个候选框
        let out = Array3::from_shape_vec(
            (1, 6, 2),
            vec![
                50., 200., // cx
                50., 200., // cy
                20., 10., // w
                40., 10., // h
                0.9, 0.1, // person
                0.05, 0.2, // tie
            ],
        )
        .unwrap();
        let xs = decode_output(out.view().into_dyn(), &names(), 0.25, 0.45).unwrap();
        assert_eq!(xs, vec![Detection::new("person", 40., 30., 60., 70., 0.9)]);
    }

    #[test]
    fn test_unknown_class_id_gets_placeholder_name() {
        let out = Array3::from_shape_vec((1, 1, 8), vec![10., 10., 4., 4., 1.0, 0., 0., 0.9])
            .unwrap();
        let xs = decode_output(out.view().into_dyn(), &names(), 0.25, 0.45).unwrap();
        assert_eq!(xs[0].label, "class2");
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let frame = RgbImage::from_pixel(64, 32, image::Rgb([255, 0, 51]));
        let xs = preprocess(&frame, 16).unwrap();
        assert_eq!(xs.shape(), &[1, 3, 16, 16]);
        assert!((xs[[0, 0, 8, 8]] - 1.0).abs() < 0.01);
        assert!(xs[[0, 1, 8, 8]] < 0.01);
        assert!((xs[[0, 2, 0, 15]] - 0.2).abs() < 0.01);
    }
}
