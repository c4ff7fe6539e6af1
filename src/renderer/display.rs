// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 窗口显示 (macroquad)
//!
//! 主循环每次迭代开始时检查 `q` / Esc, 迭代一旦开始必定执行完毕.

use image::RgbImage;
use log::{error, info};
use macroquad::prelude::{
    clear_background, draw_texture_ex, is_key_pressed, next_frame, screen_height, screen_width,
    vec2, DrawTextureParams, FilterMode, KeyCode, Texture2D, BLACK, WHITE,
};
use macroquad::texture::Image as MqImage;
use macroquad::window::Conf;

use crate::detection::{Session, StepOutcome};
use crate::input::FrameSource;
use crate::models::Detector;

pub fn window_conf(title: &str) -> Conf {
    Conf {
        window_title: title.to_owned(),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        ..Default::default()
    }
}

/// 用户是否请求退出
pub fn quit_requested() -> bool {
    is_key_pressed(KeyCode::Q) || is_key_pressed(KeyCode::Escape)
}

/// 帧显示器, 分辨率不变时复用纹理
#[derive(Default)]
pub struct Display {
    texture: Option<Texture2D>,
}

impl Display {
    pub fn new() -> Self {
        Self::default()
    }

    /// 上传新帧
    pub fn update(&mut self, frame: &RgbImage) {
        let (w, h) = frame.dimensions();
        let rgba = image::DynamicImage::ImageRgb8(frame.clone()).into_rgba8();

        let needs_rebuild = match &self.texture {
            Some(tex) => tex.width() != w as f32 || tex.height() != h as f32,
            None => true,
        };

        if needs_rebuild {
            let texture = Texture2D::from_rgba8(w as u16, h as u16, rgba.as_raw());
            texture.set_filter(FilterMode::Linear);
            self.texture = Some(texture);
        } else if let Some(tex) = &self.texture {
            tex.update(&MqImage {
                bytes: rgba.into_raw(),
                width: w as u16,
                height: h as u16,
            });
        }
    }

    /// 按窗口等比缩放居中绘制当前纹理
    pub fn draw(&self) {
        clear_background(BLACK);

        if let Some(texture) = &self.texture {
            let scale = (screen_width() / texture.width()).min(screen_height() / texture.height());
            let (w, h) = (texture.width() * scale, texture.height() * scale);
            draw_texture_ex(
                texture,
                (screen_width() - w) / 2.0,
                (screen_height() - h) / 2.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(w, h)),
                    ..Default::default()
                },
            );
        }
    }
}

/// 窗口主循环: 采集 → 推理 → 后处理 → 显示, 直到按下 `q`
pub async fn run_windowed(
    mut session: Session,
    mut source: Box<dyn FrameSource>,
    mut detector: Box<dyn Detector>,
    max_frames: Option<u64>,
) {
    let mut display = Display::new();
    let mut processed = 0u64;

    loop {
        if quit_requested() {
            info!("🛑 用户退出");
            break;
        }

        match session.step(source.as_mut(), detector.as_mut()) {
            StepOutcome::Processed(report) => {
                processed += 1;
                if let Some(img) = &report.annotated {
                    display.update(img);
                }
            }
            StepOutcome::Skipped => {}
            StepOutcome::Finished => {
                info!("📭 帧源结束");
                break;
            }
        }

        display.draw();

        if max_frames.is_some_and(|max| processed >= max) {
            break;
        }
        next_frame().await;
    }

    if processed == 0 {
        error!("❌ 未处理任何帧");
    }
    info!(
        "✅ 共处理 {} 帧, 累计 {} 个 {}",
        processed,
        session.running_total(),
        session.config().counted_label
    );
}
