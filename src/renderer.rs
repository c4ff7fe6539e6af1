// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 标注渲染: 检测框 + 类别名 + 计数叠加
//!
//! 只在副本上绘制, 不修改检测框, 不触发保存.

pub mod display;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::{info, warn};
use phf::phf_map;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::detection::{count_by_label, Detection, PERSON};

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const GREY: Rgb<u8> = Rgb([128, 128, 128]);
pub const OLIVE: Rgb<u8> = Rgb([128, 128, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// 摄像头裁剪器配色: 人 → 绿, 其余 → 灰
static MINER_COLORS: phf::Map<&'static str, [u8; 3]> = phf_map! {
    "person" => [0, 255, 0],
};

/// 口罩模型配色: mask → 绿, incorrect → 橄榄, 其余 → 红
static SCREEN_COLORS: phf::Map<&'static str, [u8; 3]> = phf_map! {
    "mask" => [0, 255, 0],
    "incorrect" => [128, 128, 0],
};

/// 类别 → 颜色
#[derive(Clone, Debug)]
pub struct Palette {
    colors: HashMap<String, Rgb<u8>>,
    default: Rgb<u8>,
}

impl Palette {
    pub fn new(default: Rgb<u8>) -> Self {
        Self {
            colors: HashMap::new(),
            default,
        }
    }

    fn from_map(map: &phf::Map<&'static str, [u8; 3]>, default: Rgb<u8>) -> Self {
        let colors = map
            .entries()
            .map(|(label, rgb)| (label.to_string(), Rgb(*rgb)))
            .collect();
        Self { colors, default }
    }

    pub fn miner() -> Self {
        Self::from_map(&MINER_COLORS, GREY)
    }

    pub fn screen() -> Self {
        Self::from_map(&SCREEN_COLORS, RED)
    }

    pub fn with(mut self, label: impl Into<String>, color: Rgb<u8>) -> Self {
        self.colors.insert(label.into(), color);
        self
    }

    pub fn color(&self, label: &str) -> Rgb<u8> {
        self.colors.get(label).copied().unwrap_or(self.default)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::miner()
    }
}

/// 检测框标注器
pub struct Annotator {
    palette: Palette,
    font: Option<FontVec>,
    counted_label: String,
    show_overlay: bool,
    thickness: u32,
    label_scale: PxScale,
    overlay_scale: PxScale,
}

impl Annotator {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            font: None,
            counted_label: PERSON.to_string(),
            show_overlay: true,
            thickness: 1,
            label_scale: PxScale::from(14.0),
            overlay_scale: PxScale::from(18.0),
        }
    }

    /// 没有字体时只画框
    pub fn with_font(mut self, font: Option<FontVec>) -> Self {
        self.font = font;
        self
    }

    pub fn with_counted_label(mut self, label: impl Into<String>) -> Self {
        self.counted_label = label.into();
        self
    }

    pub fn with_overlay(mut self, show: bool) -> Self {
        self.show_overlay = show;
        self
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness.max(1);
        self
    }

    /// 在副本上绘制所有检测框与计数
    pub fn annotate(
        &self,
        frame: &RgbImage,
        detections: &[Detection],
        running_total: u64,
    ) -> RgbImage {
        let mut img = frame.clone();

        for d in detections {
            let color = self.palette.color(&d.label);
            self.draw_box(&mut img, d, color);

            if let Some(font) = &self.font {
                let x = text_anchor(d.xmin, 10, img.width());
                let y = text_anchor(d.ymin, 10 + self.label_scale.y as i32, img.height());
                draw_text_mut(&mut img, color, x, y, self.label_scale, font, &d.label);
            }
        }

        if self.show_overlay {
            if let Some(font) = &self.font {
                let count = count_by_label(detections, &self.counted_label);
                let color = self.palette.color(&self.counted_label);
                let line = self.overlay_scale.y as i32 + 4;
                draw_text_mut(
                    &mut img,
                    color,
                    25,
                    25,
                    self.overlay_scale,
                    font,
                    &format!("People: {}", count),
                );
                draw_text_mut(
                    &mut img,
                    color,
                    25,
                    25 + line,
                    self.overlay_scale,
                    font,
                    &format!("Total Detected Objects: {}", running_total),
                );
            }
        }

        img
    }

    fn draw_box(&self, img: &mut RgbImage, d: &Detection, color: Rgb<u8>) {
        // 限制在画面外扩 thickness 的范围内, 画面外的边自然不会落到图上
        let pad = self.thickness as i64;
        let clamp = |v: f32, max: u32| -> i64 { (v as i64).clamp(-pad, max as i64 + pad) };
        let (x1, x2) = (clamp(d.xmin, img.width()), clamp(d.xmax, img.width()));
        let (y1, y2) = (clamp(d.ymin, img.height()), clamp(d.ymax, img.height()));

        let (w, h) = (x2 - x1, y2 - y1);
        if w <= 0 || h <= 0 {
            return;
        }
        for i in 0..pad {
            let (rw, rh) = (w - 2 * i, h - 2 * i);
            if rw <= 0 || rh <= 0 {
                break;
            }
            let rect = Rect::at((x1 + i) as i32, (y1 + i) as i32).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(img, rect, color);
        }
    }
}

/// 文字锚点: 向左上偏移, 并限制在画面附近
fn text_anchor(v: f32, offset: i32, max: u32) -> i32 {
    let max = max.min(i32::MAX as u32) as i32;
    (v as i32).saturating_sub(offset).clamp(-max, max)
}

/// 加载 TrueType/OpenType 字体
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("无法读取字体: {}", path.display()))?;
    let font = FontVec::try_from_vec(bytes)
        .map_err(|_| anyhow::anyhow!("无效字体文件: {}", path.display()))?;
    info!("✅ 字体加载成功: {}", path.display());
    Ok(font)
}

/// 确定标注字体: 显式指定的字体必须能加载, 自动查找失败时只画框
pub fn resolve_font(explicit: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = explicit {
        return load_font(path).map(Some);
    }
    match find_font() {
        Some(path) => match load_font(&path) {
            Ok(font) => Ok(Some(font)),
            Err(e) => {
                warn!("⚠️ {:#}, 仅绘制检测框", e);
                Ok(None)
            }
        },
        None => {
            warn!("⚠️ 未找到字体, 仅绘制检测框");
            Ok(None)
        }
    }
}

/// 查找可用字体: assets/font → 用户字体目录 → 常见系统路径
pub fn find_font() -> Option<PathBuf> {
    const NAMES: [&str; 3] = ["DejaVuSans.ttf", "Arial.ttf", "arial.ttf"];

    let mut dirs_to_try = vec![PathBuf::from("assets/font")];
    if let Some(dir) = dirs::font_dir() {
        dirs_to_try.push(dir);
    }
    dirs_to_try.push(PathBuf::from("/usr/share/fonts/truetype/dejavu"));
    dirs_to_try.push(PathBuf::from("C:\\Windows\\Fonts"));
    dirs_to_try.push(PathBuf::from("/Library/Fonts"));

    dirs_to_try
        .iter()
        .flat_map(|dir| NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes() {
        let miner = Palette::miner();
        assert_eq!(miner.color("person"), GREEN);
        assert_eq!(miner.color("tie"), GREY);

        let screen = Palette::screen();
        assert_eq!(screen.color("mask"), GREEN);
        assert_eq!(screen.color("incorrect"), OLIVE);
        assert_eq!(screen.color("no-mask"), RED);

        let custom = Palette::new(RED).with("dog", GREEN);
        assert_eq!(custom.color("dog"), GREEN);
    }

    #[test]
    fn test_two_labels_two_colors() {
        let frame = RgbImage::new(400, 400);
        let xs = vec![
            Detection::new("person", 10., 10., 110., 110., 0.9),
            Detection::new("tie", 200., 200., 260., 300., 0.8),
        ];
        let img = Annotator::new(Palette::miner()).annotate(&frame, &xs, 1);

        assert_eq!(img.get_pixel(10, 10), &GREEN);
        assert_eq!(img.get_pixel(200, 200), &GREY);
        assert_ne!(img.get_pixel(10, 10), img.get_pixel(200, 200));
        // 原图不变
        assert_eq!(frame.get_pixel(10, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_box_outside_frame_is_clipped() {
        let frame = RgbImage::new(50, 50);
        let xs = vec![
            Detection::new("person", -20., -20., 500., 500., 0.9),
            Detection::new("person", 30., 30., 30., 40., 0.9),
        ];
        let img = Annotator::new(Palette::miner())
            .with_thickness(3)
            .annotate(&frame, &xs, 0);
        assert_eq!(img.dimensions(), (50, 50));
    }

    #[test]
    fn test_box_far_outside_frame_does_not_overflow() {
        let frame = RgbImage::new(64, 64);
        let xs = vec![
            Detection::new("person", -3.0e9, -3.0e9, 10., 10., 0.9),
            Detection::new("tie", 40., 40., 3.0e9, 3.0e9, 0.9),
            Detection::new("tie", f32::MIN, 20., f32::MAX, 30., 0.9),
        ];
        for thickness in [1, 5] {
            let img = Annotator::new(Palette::miner())
                .with_thickness(thickness)
                .annotate(&frame, &xs, 0);
            // 只有落在画面内的右/下边被画出
            assert_eq!(img.get_pixel(9, 5), &GREEN);
            assert_eq!(img.get_pixel(5, 9), &GREEN);
            assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
            assert_eq!(img.get_pixel(40, 50), &GREY);
        }
    }

    #[test]
    fn test_text_anchor_saturates() {
        assert_eq!(text_anchor(100., 10, 640), 90);
        assert_eq!(text_anchor(-3.0e9, 10, 640), -640);
        assert_eq!(text_anchor(3.0e9, 10, 640), 640);
    }

    #[test]
    fn test_explicit_font_must_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_font(Some(&dir.path().join("missing.ttf"))).is_err());

        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();
        assert!(resolve_font(Some(&bogus)).is_err());
    }
}
