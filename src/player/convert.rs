// 颜色 / 方向转换
//
// 解码器输出 YUV420P（平面，色度 2x2 下采样），显示表面需要 RGB24。
// 输出分辨率固定：直接最近邻重采样到目标尺寸，不保持宽高比。
// 转换后扫描线上下翻转，因为显示表面的纵轴从底部开始。

use crate::core::{PixelFormat, PlayerError, RawFrame, Result, VideoFrame};

/// 每像素字节数（RGB24）
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// YUV420P → RGB24 转换器（缓存重采样坐标表）
pub struct ColorConverter {
    dst_width: u32,
    dst_height: u32,
    src_size: Option<(u32, u32)>,
    x_map: Vec<usize>,
    y_map: Vec<usize>,
}

impl ColorConverter {
    pub fn new(dst_width: u32, dst_height: u32) -> Self {
        Self {
            dst_width,
            dst_height,
            src_size: None,
            x_map: Vec::new(),
            y_map: Vec::new(),
        }
    }

    /// 源分辨率变化时重建坐标表
    fn prepare(&mut self, src_width: u32, src_height: u32) {
        if self.src_size == Some((src_width, src_height)) {
            return;
        }

        self.x_map = (0..self.dst_width as usize)
            .map(|x| x * src_width as usize / self.dst_width as usize)
            .collect();
        self.y_map = (0..self.dst_height as usize)
            .map(|y| y * src_height as usize / self.dst_height as usize)
            .collect();
        self.src_size = Some((src_width, src_height));
    }

    /// 转换一帧；非 YUV420P 帧返回 UnsupportedPixelFormat，由调用方丢弃
    pub fn convert(&mut self, frame: &RawFrame) -> Result<VideoFrame> {
        if frame.format != PixelFormat::YUV420P {
            return Err(PlayerError::UnsupportedPixelFormat(frame.format.to_string()));
        }
        if frame.width == 0 || frame.height == 0 || !planes_complete(frame) {
            return Err(PlayerError::UnsupportedPixelFormat(format!(
                "{} ({}x{}, 平面数据不完整)",
                frame.format, frame.width, frame.height
            )));
        }

        self.prepare(frame.width, frame.height);

        let y_plane = &frame.planes[0];
        let u_plane = &frame.planes[1];
        let v_plane = &frame.planes[2];

        let dst_width = self.dst_width as usize;
        let mut rgb = vec![0u8; dst_width * self.dst_height as usize * RGB_BYTES_PER_PIXEL];

        for (row, &src_y) in rgb
            .chunks_exact_mut(dst_width * RGB_BYTES_PER_PIXEL)
            .zip(self.y_map.iter())
        {
            let y_row = src_y * y_plane.stride;
            let u_row = (src_y / 2) * u_plane.stride;
            let v_row = (src_y / 2) * v_plane.stride;

            for (pixel, &src_x) in row
                .chunks_exact_mut(RGB_BYTES_PER_PIXEL)
                .zip(self.x_map.iter())
            {
                let luma = y_plane.data[y_row + src_x];
                let cb = u_plane.data[u_row + src_x / 2];
                let cr = v_plane.data[v_row + src_x / 2];
                pixel.copy_from_slice(&yuv_to_rgb(luma, cb, cr));
            }
        }

        flip_vertical(&mut rgb, dst_width, self.dst_height as usize);

        Ok(VideoFrame {
            pts: frame.pts,
            width: self.dst_width,
            height: self.dst_height,
            format: PixelFormat::RGB24,
            data: rgb,
        })
    }
}

fn planes_complete(frame: &RawFrame) -> bool {
    if frame.planes.len() < 3 {
        return false;
    }
    let width = frame.width as usize;
    let height = frame.height as usize;
    let chroma_width = (width + 1) / 2;
    let chroma_height = (height + 1) / 2;

    let fits = |index: usize, w: usize, h: usize| {
        let plane = &frame.planes[index];
        plane.stride >= w && plane.data.len() >= plane.stride * (h - 1) + w
    };

    fits(0, width, height) && fits(1, chroma_width, chroma_height) && fits(2, chroma_width, chroma_height)
}

/// BT.601 有限范围 YUV → RGB（定点运算）
#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    [r.clamp(0, 255) as u8, g.clamp(0, 255) as u8, b.clamp(0, 255) as u8]
}

/// 原地上下翻转 RGB24 缓冲区的扫描线（第 0 行与第 N-1 行交换，依此类推）
///
/// 翻转两次恢复原始顺序
pub fn flip_vertical(buf: &mut [u8], width: usize, height: usize) {
    let row_len = width * RGB_BYTES_PER_PIXEL;
    debug_assert!(buf.len() >= row_len * height);

    for top in 0..height / 2 {
        let bottom = height - 1 - top;
        let (upper, lower) = buf.split_at_mut(bottom * row_len);
        upper[top * row_len..(top + 1) * row_len].swap_with_slice(&mut lower[..row_len]);
    }
}
