// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 像素格式转换 → RGB24
//!
//! 定点系数: R = Y + 1.402V, G = Y - 0.344U - 0.714V, B = Y + 1.772U (×128)

use image::RgbImage;

/// 解码器输出的像素格式 (AVPixelFormat 编号)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Yuv420p,
    Yuv422p,
    Yuyv422,
    Rgb24,
    Bgr24,
    Bgra,
}

impl PixelLayout {
    pub fn from_av_format(format: i32) -> Option<Self> {
        match format {
            0 | 12 => Some(Self::Yuv420p),
            4 | 13 => Some(Self::Yuv422p),
            1 => Some(Self::Yuyv422),
            2 => Some(Self::Rgb24),
            3 => Some(Self::Bgr24),
            28 => Some(Self::Bgra),
            _ => None,
        }
    }

    /// 平面数量
    pub fn planes(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p => 3,
            _ => 1,
        }
    }

    /// 色度平面的行数
    pub fn chroma_rows(&self, height: usize) -> usize {
        match self {
            Self::Yuv420p => height.div_ceil(2),
            _ => height,
        }
    }
}

#[inline]
fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    [
        (y + ((v * 179) >> 7)).clamp(0, 255) as u8,
        (y - ((u * 44) >> 7) - ((v * 91) >> 7)).clamp(0, 255) as u8,
        (y + ((u * 227) >> 7)).clamp(0, 255) as u8,
    ]
}

/// 平面 YUV (4:2:0 或 4:2:2) → RGB
#[allow(clippy::too_many_arguments)]
pub fn planar_yuv_to_rgb(
    y_plane: &[u8],
    u_plane: &[u8],
    v_plane: &[u8],
    y_stride: usize,
    uv_stride: usize,
    width: usize,
    height: usize,
    vertical_subsample: bool,
) -> RgbImage {
    let mut buffer = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        let y_row = row * y_stride;
        let uv_row = if vertical_subsample { row >> 1 } else { row } * uv_stride;
        for col in 0..width {
            let uv = uv_row + (col >> 1);
            buffer.extend_from_slice(&yuv_pixel(y_plane[y_row + col], u_plane[uv], v_plane[uv]));
        }
    }
    RgbImage::from_raw(width as u32, height as u32, buffer).unwrap_or_default()
}

/// 打包 YUYV (Y0 U Y1 V) → RGB, 常见于 V4L2 摄像头
pub fn yuyv422_to_rgb(data: &[u8], stride: usize, width: usize, height: usize) -> RgbImage {
    let mut buffer = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        let line = &data[row * stride..];
        for col in 0..width {
            let pair = (col >> 1) * 4;
            let y = line[pair + (col & 1) * 2];
            buffer.extend_from_slice(&yuv_pixel(y, line[pair + 1], line[pair + 3]));
        }
    }
    RgbImage::from_raw(width as u32, height as u32, buffer).unwrap_or_default()
}

/// 打包 RGB/BGR/BGRA → RGB
pub fn packed_to_rgb(
    data: &[u8],
    stride: usize,
    width: usize,
    height: usize,
    layout: PixelLayout,
) -> RgbImage {
    let (bpp, swap) = match layout {
        PixelLayout::Rgb24 => (3, false),
        PixelLayout::Bgr24 => (3, true),
        _ => (4, true),
    };
    let mut buffer = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        let line = &data[row * stride..row * stride + width * bpp];
        for px in line.chunks_exact(bpp) {
            if swap {
                buffer.extend_from_slice(&[px[2], px[1], px[0]]);
            } else {
                buffer.extend_from_slice(&px[..3]);
            }
        }
    }
    RgbImage::from_raw(width as u32, height as u32, buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_av_format_mapping() {
        assert_eq!(PixelLayout::from_av_format(0), Some(PixelLayout::Yuv420p));
        assert_eq!(PixelLayout::from_av_format(12), Some(PixelLayout::Yuv420p));
        assert_eq!(PixelLayout::from_av_format(1), Some(PixelLayout::Yuyv422));
        assert_eq!(PixelLayout::from_av_format(28), Some(PixelLayout::Bgra));
        assert_eq!(PixelLayout::from_av_format(999), None);
        assert_eq!(PixelLayout::Yuv420p.chroma_rows(5), 3);
        assert_eq!(PixelLayout::Yuv422p.chroma_rows(5), 5);
    }

    #[test]
    fn test_neutral_chroma_is_grey() {
        let y = [16u8, 128, 235, 0];
        let img = planar_yuv_to_rgb(&y, &[128], &[128], 2, 1, 2, 2, true);
        assert_eq!(img.get_pixel(0, 0).0, [16, 16, 16]);
        assert_eq!(img.get_pixel(1, 0).0, [128, 128, 128]);
        assert_eq!(img.get_pixel(0, 1).0, [235, 235, 235]);
    }

    #[test]
    fn test_strong_v_pushes_red() {
        let img = planar_yuv_to_rgb(&[128], &[128], &[255], 1, 1, 1, 1, true);
        let [r, g, b] = img.get_pixel(0, 0).0;
        assert_eq!(r, 255);
        assert!(g < 128);
        assert_eq!(b, 128);
    }

    #[test]
    fn test_yuyv_pairs_share_chroma() {
        let data = [50u8, 128, 200, 128];
        let img = yuyv422_to_rgb(&data, 4, 2, 1);
        assert_eq!(img.get_pixel(0, 0).0, [50, 50, 50]);
        assert_eq!(img.get_pixel(1, 0).0, [200, 200, 200]);
    }

    #[test]
    fn test_packed_layouts_respect_stride() {
        // 每行带 2 字节填充
        let bgr = [1u8, 2, 3, 0, 0, 4, 5, 6, 0, 0];
        let img = packed_to_rgb(&bgr, 5, 1, 2, PixelLayout::Bgr24);
        assert_eq!(img.get_pixel(0, 0).0, [3, 2, 1]);
        assert_eq!(img.get_pixel(0, 1).0, [6, 5, 4]);

        let bgra = [10u8, 20, 30, 255];
        let img = packed_to_rgb(&bgra, 4, 1, 1, PixelLayout::Bgra);
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10]);

        let rgb = [7u8, 8, 9];
        let img = packed_to_rgb(&rgb, 3, 1, 1, PixelLayout::Rgb24);
        assert_eq!(img.get_pixel(0, 0).0, [7, 8, 9]);
    }
}
