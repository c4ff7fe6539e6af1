// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// FFmpeg解码过滤器: 采集设备 → RGB帧 → 通道
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Frame, Input};
use image::RgbImage;
use log::{error, info, warn};
use std::collections::HashMap;
use std::slice;
use std::thread;
use std::time::{Duration, Instant};

use super::convert::{packed_to_rgb, planar_yuv_to_rgb, yuyv422_to_rgb, PixelLayout};
use crate::error::PipelineError;

pub struct DecodeFilter {
    tx: Sender<RgbImage>,
    count: usize,
    last: Instant,
    dropped_frames: usize,
    total_frames: usize,
}

impl DecodeFilter {
    pub fn new(tx: Sender<RgbImage>) -> Self {
        Self {
            tx,
            count: 0,
            last: Instant::now(),
            dropped_frames: 0,
            total_frames: 0,
        }
    }

    fn drop_frame(&mut self, reason: &str) -> Result<Option<Frame>, String> {
        self.dropped_frames += 1;
        if self.total_frames <= 10 {
            warn!("⚠️ 丢弃帧 #{}: {}", self.total_frames, reason);
        }
        Ok(None)
    }

    /// 把 AVFrame 各平面拷贝为 RGB 图像
    ///
    /// # Safety
    /// `frame` 必须是非空且未损坏的视频帧.
    unsafe fn to_rgb(frame: &Frame, layout: PixelLayout) -> Option<RgbImage> {
        let raw = &*frame.as_ptr();
        let (w, h) = (raw.width as usize, raw.height as usize);
        let strides: Vec<usize> = raw.linesize.iter().map(|&s| s.max(0) as usize).collect();

        for plane in 0..layout.planes() {
            if raw.data[plane].is_null() || strides[plane] == 0 {
                return None;
            }
        }

        let image = match layout {
            PixelLayout::Yuv420p | PixelLayout::Yuv422p => {
                let chroma = layout.chroma_rows(h);
                let y = slice::from_raw_parts(raw.data[0], strides[0] * h);
                let u = slice::from_raw_parts(raw.data[1], strides[1] * chroma);
                let v = slice::from_raw_parts(raw.data[2], strides[2] * chroma);
                if strides[0] < w || strides[1] < w.div_ceil(2) {
                    return None;
                }
                planar_yuv_to_rgb(
                    y,
                    u,
                    v,
                    strides[0],
                    strides[1],
                    w,
                    h,
                    layout == PixelLayout::Yuv420p,
                )
            }
            PixelLayout::Yuyv422 => {
                if strides[0] < w.div_ceil(2) * 4 {
                    return None;
                }
                yuyv422_to_rgb(slice::from_raw_parts(raw.data[0], strides[0] * h), strides[0], w, h)
            }
            _ => {
                let bpp = if layout == PixelLayout::Bgra { 4 } else { 3 };
                if strides[0] < w * bpp {
                    return None;
                }
                packed_to_rgb(
                    slice::from_raw_parts(raw.data[0], strides[0] * h),
                    strides[0],
                    w,
                    h,
                    layout,
                )
            }
        };
        Some(image)
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        self.total_frames += 1;

        if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
            return self.drop_frame("空帧/损坏帧");
        }

        let (w, h, format) = unsafe {
            let raw = &*frame.as_ptr();
            (raw.width, raw.height, raw.format)
        };
        if w <= 0 || h <= 0 || w > 8192 || h > 8192 {
            return self.drop_frame(&format!("非法分辨率 {}x{}", w, h));
        }

        let Some(layout) = PixelLayout::from_av_format(format) else {
            return self.drop_frame(&format!("不支持的像素格式 {}", format));
        };

        let Some(image) = (unsafe { Self::to_rgb(&frame, layout) }) else {
            return self.drop_frame("平面指针或步长异常");
        };

        match self.tx.try_send(image) {
            Ok(()) => self.count += 1,
            // 消费者未取走上一帧, 丢弃
            Err(TrySendError::Full(_)) => self.dropped_frames += 1,
            Err(TrySendError::Disconnected(_)) => return Err("frame receiver closed".to_string()),
        }

        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            let drop_rate = self.dropped_frames as f64 / self.total_frames as f64 * 100.0;
            info!(
                "📺 解码统计: 输出{}帧 | {:.1}fps | 总帧{} | 丢弃{} ({:.1}%)",
                self.count,
                self.count as f64 / elapsed,
                self.total_frames,
                self.dropped_frames,
                drop_rate
            );
            self.last = Instant::now();
            self.count = 0;
        }

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!("✅ 解码线程退出");
    }
}

/// 采集流: 后台线程运行 FFmpeg, 通过通道交付帧
pub struct CaptureStream {
    rx: Receiver<RgbImage>,
    timeout: Duration,
}

impl CaptureStream {
    /// 启动后台采集线程
    ///
    /// 构建或启动失败时线程退出, 通道随之断开, 读端表现为帧源结束.
    pub fn spawn(
        format: &str,
        url: &str,
        opts: Vec<(&'static str, String)>,
        timeout: Duration,
    ) -> Self {
        let (tx, rx) = bounded::<RgbImage>(1);
        let format = format.to_owned();
        let url = url.to_owned();

        thread::spawn(move || {
            info!("🔍 使用格式: {}, 输入: {}", format, url);

            let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
            let pipe = pipe.filter("decode", Box::new(DecodeFilter::new(tx)));
            let out = create_null_output().add_frame_pipeline(pipe);

            let opts: HashMap<String, String> =
                opts.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
            let input = Input::new(url.as_str())
                .set_format(format.as_str())
                .set_input_opts(opts);

            let ctx = match FfmpegContext::builder().input(input).output(out).build() {
                Ok(ctx) => ctx,
                Err(e) => {
                    error!("❌ 采集构建失败: {}", e);
                    return;
                }
            };
            let sch = match ctx.start() {
                Ok(sch) => sch,
                Err(e) => {
                    error!("❌ 采集启动失败: {}", e);
                    return;
                }
            };

            info!("✅ 采集连接成功, 开始解码!");
            let _ = sch.wait();
            info!("📹 采集循环结束");
        });

        Self { rx, timeout }
    }

    /// 等待下一帧
    pub fn recv(&self) -> Result<RgbImage, PipelineError> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(PipelineError::CaptureFailure(format!(
                "no frame within {:?}",
                self.timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::SourceClosed),
        }
    }
}
