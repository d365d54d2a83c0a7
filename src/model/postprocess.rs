// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/model/postprocess.rs - YOLO 输出解码与非极大值抑制
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

use tracing::debug;

use super::YoloError;

/// NMS 之前最多保留的候选框数
const MAX_NMS_CANDIDATES: usize = 30000;

/// 模型输入坐标系下的候选框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub class_id: usize,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

/// 输出张量的排布
#[derive(Debug, Clone, Copy, PartialEq)]
enum Layout {
  /// [1, 4 + nc, N]
  FeaturesFirst { features: usize, anchors: usize },
  /// [1, N, 4 + nc]
  AnchorsFirst { features: usize, anchors: usize },
}

impl Layout {
  fn detect(shape: &[usize], num_classes: Option<usize>) -> Option<Self> {
    let &[1, a, b] = shape else {
      return None;
    };

    let features_first = Layout::FeaturesFirst {
      features: a,
      anchors: b,
    };
    let anchors_first = Layout::AnchorsFirst {
      features: b,
      anchors: a,
    };

    match num_classes {
      Some(nc) if a == 4 + nc => Some(features_first),
      Some(nc) if b == 4 + nc => Some(anchors_first),
      Some(_) => None,
      None if a > 4 && (a <= b || b <= 4) => Some(features_first),
      None if b > 4 => Some(anchors_first),
      None => None,
    }
  }

  fn features(&self) -> usize {
    match *self {
      Layout::FeaturesFirst { features, .. } | Layout::AnchorsFirst { features, .. } => features,
    }
  }

  fn anchors(&self) -> usize {
    match *self {
      Layout::FeaturesFirst { anchors, .. } | Layout::AnchorsFirst { anchors, .. } => anchors,
    }
  }

  fn at(&self, data: &[f32], feature: usize, anchor: usize) -> f32 {
    match *self {
      Layout::FeaturesFirst { anchors, .. } => data[feature * anchors + anchor],
      Layout::AnchorsFirst { features, .. } => data[anchor * features + feature],
    }
  }
}

/// 解码 YOLOv8/11 检测头输出，每个锚点取最高分类别，分数不高于阈值的丢弃
pub fn decode_output(
  data: &[f32],
  shape: &[usize],
  num_classes: Option<usize>,
  confidence: f32,
) -> Result<Vec<Candidate>, YoloError> {
  let layout =
    Layout::detect(shape, num_classes).ok_or_else(|| YoloError::OutputShape(shape.to_vec()))?;
  if data.len() != layout.features() * layout.anchors() {
    return Err(YoloError::OutputShape(shape.to_vec()));
  }

  let classes = layout.features() - 4;
  debug!(
    "输出排布 {:?}，锚点数 {}，类别数 {}",
    layout,
    layout.anchors(),
    classes
  );

  let mut candidates = Vec::new();
  for anchor in 0..layout.anchors() {
    let (class_id, score) = (0..classes)
      .map(|c| (c, layout.at(data, 4 + c, anchor)))
      .fold((0usize, f32::MIN), |best, cur| {
        if cur.1 > best.1 { cur } else { best }
      });

    if score <= confidence {
      continue;
    }

    let cx = layout.at(data, 0, anchor);
    let cy = layout.at(data, 1, anchor);
    let w = layout.at(data, 2, anchor);
    let h = layout.at(data, 3, anchor);

    candidates.push(Candidate {
      class_id,
      score,
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    });
  }

  Ok(candidates)
}

/// 按类别的非极大值抑制，结果按置信度降序
pub fn non_max_suppression(
  mut candidates: Vec<Candidate>,
  iou_threshold: f32,
  max_detections: usize,
) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
  candidates.truncate(MAX_NMS_CANDIDATES);

  let mut kept: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    if kept.len() >= max_detections {
      break;
    }
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold);
    if !suppressed {
      kept.push(candidate);
    }
  }
  kept
}

/// 计算两个 xyxy 框的 IoU
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
