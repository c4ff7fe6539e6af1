// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 摄像头输入模块
//!
//! 处理本地摄像头输入,支持 DirectShow(Windows) / AVFoundation(macOS) / V4L2(Linux)

use anyhow::{bail, Result};
use image::RgbImage;
use log::{info, warn};
use std::time::Duration;

use super::decode_filter::CaptureStream;
use super::FrameSource;
use crate::error::PipelineError;

#[cfg(target_os = "windows")]
const CAMERA_FORMAT: &str = "dshow";
#[cfg(target_os = "macos")]
const CAMERA_FORMAT: &str = "avfoundation";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const CAMERA_FORMAT: &str = "v4l2";

pub struct CameraSource {
    stream: CaptureStream,
}

impl CameraSource {
    /// 按设备索引打开摄像头, 请求 width x height
    pub fn open(device_index: usize, width: u32, height: u32) -> Result<Self> {
        let url = camera_url(device_index)?;
        info!("📷 摄像头 #{} → {} ({}x{})", device_index, url, width, height);

        let stream = CaptureStream::spawn(
            CAMERA_FORMAT,
            &url,
            vec![
                ("framerate", "30".to_string()),
                ("video_size", format!("{}x{}", width, height)),
            ],
            Duration::from_secs(5),
        );
        Ok(Self { stream })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<RgbImage, PipelineError> {
        self.stream.recv()
    }
}

#[cfg(target_os = "windows")]
fn camera_url(index: usize) -> Result<String> {
    let devices = list_video_devices();
    match devices.get(index) {
        Some(name) => Ok(format!("video={}", name)),
        None => bail!("摄像头索引 {} 不存在 (共 {} 个设备)", index, devices.len()),
    }
}

#[cfg(not(target_os = "windows"))]
fn camera_url(index: usize) -> Result<String> {
    if cfg!(target_os = "macos") {
        Ok(index.to_string())
    } else {
        let path = format!("/dev/video{}", index);
        if !std::path::Path::new(&path).exists() {
            bail!("摄像头设备不存在: {}", path);
        }
        Ok(path)
    }
}

/// 获取可用的摄像头设备列表
pub fn list_video_devices() -> Vec<String> {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!("⚠️ 获取摄像头列表失败: {}", e);
            vec![]
        }
    }
}
