// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/model.rs - 模型
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

/// 模型推理默认置信度阈值
pub const DEFAULT_CONFIDENCE: f32 = 0.25;
/// NMS 默认 IOU 阈值
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
/// 单张图像最多保留的检测数
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: usize,
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

/// 按置信度降序排列的检测结果
#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn iter(&self) -> impl Iterator<Item = &DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

mod metadata;
mod postprocess;
mod yolo;

pub use self::metadata::{MetadataError, ModelMetadata};
pub use self::postprocess::{Candidate, decode_output, non_max_suppression};
pub use self::yolo::{Yolo, YoloBuilder, YoloError};
