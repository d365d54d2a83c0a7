// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/frame.rs - NCHW 帧定义与 letterbox 变换
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{RgbImage, imageops::FilterType};
use ndarray::{Array4, ArrayView4};

use crate::input::AsNchwFrame;

const RGB_CHANNELS: usize = 3;

/// 填充色 (114, 114, 114)
pub const LETTERBOX_FILL: u8 = 114;

/// 保持宽高比缩放并居中填充后的几何信息，用于把检测框映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub gain: f32,
  pub pad_x: f32,
  pub pad_y: f32,
  pub resized_width: u32,
  pub resized_height: u32,
  pub source_width: u32,
  pub source_height: u32,
}

impl Letterbox {
  pub fn new(source_width: u32, source_height: u32, width: u32, height: u32) -> Self {
    let gain = (height as f32 / source_height as f32).min(width as f32 / source_width as f32);
    let resized_width = ((source_width as f32 * gain).round_ties_even() as u32).clamp(1, width);
    let resized_height = ((source_height as f32 * gain).round_ties_even() as u32).clamp(1, height);

    let dw = (width - resized_width) as f32 / 2.0;
    let dh = (height - resized_height) as f32 / 2.0;

    Self {
      gain,
      pad_x: (dw - 0.1).round_ties_even().max(0.0),
      pad_y: (dh - 0.1).round_ties_even().max(0.0),
      resized_width,
      resized_height,
      source_width,
      source_height,
    }
  }

  /// 模型输入坐标系下的 [x_min, y_min, x_max, y_max] 映射回原图像素坐标
  pub fn restore(&self, bbox: [f32; 4]) -> [f32; 4] {
    let w = self.source_width as f32;
    let h = self.source_height as f32;
    [
      ((bbox[0] - self.pad_x) / self.gain).clamp(0.0, w),
      ((bbox[1] - self.pad_y) / self.gain).clamp(0.0, h),
      ((bbox[2] - self.pad_x) / self.gain).clamp(0.0, w),
      ((bbox[3] - self.pad_y) / self.gain).clamp(0.0, h),
    ]
  }
}

/// 归一化到 [0, 1] 的 RGB NCHW 浮点帧
#[derive(Debug, Clone)]
pub struct RgbNchwFrame {
  data: Array4<f32>,
  letterbox: Letterbox,
}

impl RgbNchwFrame {
  pub fn letterboxed(image: &RgbImage, width: u32, height: u32) -> Self {
    let (source_width, source_height) = image.dimensions();
    let letterbox = Letterbox::new(source_width, source_height, width, height);

    let resized = image::imageops::resize(
      image,
      letterbox.resized_width,
      letterbox.resized_height,
      FilterType::Triangle,
    );

    let fill = LETTERBOX_FILL as f32 / 255.0;
    let mut data = Array4::<f32>::from_elem(
      (1, RGB_CHANNELS, height as usize, width as usize),
      fill,
    );

    let offset_x = letterbox.pad_x as usize;
    let offset_y = letterbox.pad_y as usize;
    for (x, y, pixel) in resized.enumerate_pixels() {
      let row = offset_y + y as usize;
      let col = offset_x + x as usize;
      if row >= height as usize || col >= width as usize {
        continue;
      }
      for c in 0..RGB_CHANNELS {
        data[[0, c, row, col]] = pixel[c] as f32 / 255.0;
      }
    }

    Self { data, letterbox }
  }
}

impl AsNchwFrame for RgbNchwFrame {
  fn as_nchw(&self) -> ArrayView4<'_, f32> {
    self.data.view()
  }

  fn letterbox(&self) -> &Letterbox {
    &self.letterbox
  }
}
