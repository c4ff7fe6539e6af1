// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 配置: JSON 配置文件 + 命令行参数
//!
//! 优先级: 命令行 > 配置文件 > 默认值

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::detection::{INF_SIZE, PERSON};
use crate::input::ScreenRegion;

/// 后处理参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    // === 保存过滤 ===
    pub min_size: f32,       // 裁剪最小边长(像素)
    pub min_confidence: f32, // 保存置信度阈值

    // === 节奏 (0 = 关闭) ===
    pub persist_every: u64, // 每N帧保存一次裁剪图
    pub render_every: u64,  // 每N帧绘制一次标注图

    // === 检测器 ===
    pub inf_size: u32,       // 推理输入尺寸
    pub detector_conf: f32,  // 检测置信度阈值
    pub detector_iou: f32,   // NMS IOU阈值

    // === 计数与输出 ===
    pub counted_label: String,
    pub output_dir: PathBuf,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_size: 100.0,
            min_confidence: 0.7,

            persist_every: 1,
            render_every: 1,

            inf_size: INF_SIZE,
            detector_conf: 0.25,
            detector_iou: 0.45,

            counted_label: PERSON.to_string(),
            output_dir: PathBuf::from("runs/detect/miner"),
        }
    }
}

impl MinerConfig {
    /// 从JSON文件加载配置, 文件不存在时写出默认配置
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️ 配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path);
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    error!("❌ 保存配置失败: {}", e);
                } else {
                    info!("💾 配置已保存到 {}", path.display());
                }
            }
            Err(e) => error!("❌ 序列化配置失败: {}", e),
        }
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️ 当前配置:");
        info!("  最小裁剪尺寸: {}px", self.min_size);
        info!("  保存置信度: {:.2}", self.min_confidence);
        info!("  保存间隔: 每{}帧", self.persist_every);
        info!("  绘制间隔: 每{}帧", self.render_every);
        info!("  推理尺寸: {}", self.inf_size);
        info!("  计数类别: {}", self.counted_label);
        info!("  输出目录: {}", self.output_dir.display());
    }
}

/// 帧源类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// 本地摄像头 (需要 ffmpeg 特性)
    Camera,
    /// 桌面截屏 (需要 ffmpeg 特性)
    Desktop,
    /// 图片目录回放
    Dir,
}

/// 摄像头裁剪器参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Crop detected objects from a live feed", long_about = None)]
pub struct MinerArgs {
    /// 检测模型 (.onnx) 或检测结果回放文件 (.jsonl)
    #[arg(short, long, default_value = "models/yolov5s.onnx")]
    pub model: PathBuf,

    /// 类别名文件 (每行一个), 默认 COCO
    #[arg(long)]
    pub names: Option<PathBuf>,

    /// JSON 配置文件
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Minimum Pixel Size (how many pixels the crop detection needs to be) [default: 100]
    #[arg(short, long)]
    pub size: Option<f32>,

    /// Confidence threshold on detections [default: 0.7]
    #[arg(short, long)]
    pub confidence: Option<f32>,

    /// How frequently to capture cropped detected objects (every Nth frame, 0 = never) [default: 1]
    #[arg(short, long)]
    pub frequency: Option<u64>,

    /// How frequently to draw the annotated frame (every Nth frame, 0 = never) [default: 1]
    #[arg(long)]
    pub render_every: Option<u64>,

    /// 裁剪图输出目录 [default: runs/detect/miner]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 推理输入尺寸 [default: 640]
    #[arg(long)]
    pub inf_size: Option<u32>,

    /// 计数类别 [default: person]
    #[arg(long)]
    pub label: Option<String>,

    /// 帧源
    #[arg(long, value_enum, default_value_t = SourceKind::Camera)]
    pub source: SourceKind,

    /// 摄像头设备索引
    #[arg(short = 'd', long, default_value_t = 0)]
    pub device: usize,

    /// 图片目录 (source=dir)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// 标注字体 (.ttf/.otf)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 不打开窗口
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// 处理N帧后退出
    #[arg(long)]
    pub max_frames: Option<u64>,
}

impl MinerArgs {
    /// 合并配置文件与命令行参数
    pub fn resolve(&self) -> MinerConfig {
        let mut config = match &self.config {
            Some(path) => MinerConfig::load(path),
            None => MinerConfig::default(),
        };

        if let Some(v) = self.size {
            config.min_size = v;
        }
        if let Some(v) = self.confidence {
            config.min_confidence = v;
        }
        if let Some(v) = self.frequency {
            config.persist_every = v;
        }
        if let Some(v) = self.render_every {
            config.render_every = v;
        }
        if let Some(v) = &self.output {
            config.output_dir = v.clone();
        }
        if let Some(v) = self.inf_size {
            config.inf_size = v;
        }
        if let Some(v) = &self.label {
            config.counted_label = v.clone();
        }
        config
    }
}

/// 屏幕检测模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScreenMode {
    /// 整屏截图
    Screenshot,
    /// 固定区域 (小地图)
    League,
}

impl ScreenMode {
    pub fn region(&self) -> Option<ScreenRegion> {
        match self {
            ScreenMode::Screenshot => None,
            ScreenMode::League => Some(ScreenRegion::LEAGUE_MINIMAP),
        }
    }
}

/// 屏幕检测参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Run a detector over the screen", long_about = None)]
pub struct ScreenArgs {
    /// Model path
    #[arg(short, long)]
    pub model: PathBuf,

    /// Detection mode (league / screenshot)
    #[arg(short, long, value_enum, default_value_t = ScreenMode::Screenshot)]
    pub detect: ScreenMode,

    /// 类别名文件 (每行一个), 默认 COCO
    #[arg(long)]
    pub names: Option<PathBuf>,

    /// 检测置信度阈值
    #[arg(long, default_value_t = 0.25)]
    pub conf: f32,

    /// 推理输入尺寸
    #[arg(long, default_value_t = INF_SIZE)]
    pub inf_size: u32,

    /// 图片目录回放 (代替桌面截屏)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// 标注字体 (.ttf/.otf)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 不打开窗口
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// 处理N帧后退出
    #[arg(long)]
    pub max_frames: Option<u64>,
}

impl ScreenArgs {
    /// 屏幕模式不保存裁剪图
    pub fn resolve(&self) -> MinerConfig {
        MinerConfig {
            persist_every: 0,
            inf_size: self.inf_size,
            detector_conf: self.conf,
            ..MinerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MinerConfig::default();
        assert_eq!(config.min_size, 100.0);
        assert_eq!(config.min_confidence, 0.7);
        assert_eq!(config.persist_every, 1);
        assert_eq!(config.inf_size, 640);
        assert_eq!(config.counted_label, "person");
    }

    #[test]
    fn test_cli_defaults_match_config_defaults() {
        let args = MinerArgs::parse_from(["miner"]);
        assert_eq!(args.resolve(), MinerConfig::default());

        let args = MinerArgs::parse_from(["miner", "-s", "50", "-c", "0.4", "-f", "3"]);
        let config = args.resolve();
        assert_eq!(config.min_size, 50.0);
        assert_eq!(config.min_confidence, 0.4);
        assert_eq!(config.persist_every, 3);
        assert_eq!(config.render_every, 1);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miner.json");
        let config = MinerConfig::load(&path);
        assert_eq!(config, MinerConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_and_cli_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miner.json");
        fs::write(&path, r#"{ "min_size": 64, "render_every": 5 }"#).unwrap();

        let loaded = MinerConfig::load(&path);
        assert_eq!(loaded.min_size, 64.0);
        assert_eq!(loaded.render_every, 5);
        assert_eq!(loaded.min_confidence, 0.7);

        let args = MinerArgs::parse_from([
            "miner",
            "--config",
            path.to_str().unwrap(),
            "--size",
            "32",
        ]);
        let config = args.resolve();
        assert_eq!(config.min_size, 32.0);
        assert_eq!(config.render_every, 5);
    }

    #[test]
    fn test_screen_mode_disables_persistence() {
        let args = ScreenArgs::parse_from(["screen", "-m", "best.onnx", "-d", "league"]);
        assert_eq!(args.resolve().persist_every, 0);
        assert_eq!(args.detect.region(), Some(ScreenRegion::LEAGUE_MINIMAP));
    }
}
