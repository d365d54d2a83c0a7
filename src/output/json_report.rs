// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/output/json_report.rs - 单行 JSON 结果输出
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

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
  Variant,
  info::{FishInfo, unknown_info},
  model::DetectResult,
  output::{OutputError, Render},
};

const TOP_K: usize = 3;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Prediction {
  pub class: String,
  pub confidence: f64,
}

/// 成功时输出的结果，字段顺序即 JSON 键顺序；数值按 f64 输出
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Report {
  pub status: &'static str,
  pub model_type: &'static str,
  pub predicted_class: Option<String>,
  pub confidence: f64,
  pub top_3_predictions: Vec<Prediction>,
  pub info: Value,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub boxes: Option<Vec<[f64; 4]>>,
}

impl Report {
  pub fn build(variant: Variant, result: &DetectResult, threshold: f32, info: &FishInfo) -> Self {
    let kept: Vec<_> = result.iter().filter(|d| d.score >= threshold).collect();

    // 取第一个最高分
    let Some(best) = kept
      .iter()
      .copied()
      .reduce(|best, cur| if cur.score > best.score { cur } else { best })
    else {
      return Self {
        status: "success",
        model_type: variant.model_type(),
        predicted_class: None,
        confidence: 0.0,
        top_3_predictions: Vec::new(),
        info: unknown_info(),
        boxes: None,
      };
    };

    let mut ranked = kept.clone();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    let top_3_predictions = ranked
      .iter()
      .take(TOP_K)
      .map(|d| Prediction {
        class: d.label.clone(),
        confidence: f64::from(d.score),
      })
      .collect();

    let boxes = variant
      .with_boxes()
      .then(|| kept.iter().map(|d| d.bbox.map(f64::from)).collect());

    Self {
      status: "success",
      model_type: variant.model_type(),
      predicted_class: Some(best.label.clone()),
      confidence: f64::from(best.score),
      top_3_predictions,
      info: info.lookup(&best.label),
      boxes,
    }
  }
}

/// 失败时输出的结果
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorReport {
  pub error: String,
  pub status: &'static str,
}

impl ErrorReport {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      status: "error",
    }
  }

  pub fn write_line<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
    write_line(writer, self)
  }
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), OutputError> {
  serde_json::to_writer(&mut *writer, value)?;
  writer.write_all(b"\n")?;
  writer.flush()?;
  Ok(())
}

/// 把检测结果整理为单行 JSON 写入输出流
pub struct JsonLineOutput<W: Write> {
  writer: Mutex<W>,
  variant: Variant,
  threshold: f32,
  info: FishInfo,
}

impl<W: Write> JsonLineOutput<W> {
  pub fn new(writer: W, variant: Variant, threshold: f32, info: FishInfo) -> Self {
    Self {
      writer: Mutex::new(writer),
      variant,
      threshold,
      info,
    }
  }

  pub fn into_inner(self) -> Result<W, OutputError> {
    self.writer.into_inner().map_err(|_| OutputError::Poisoned)
  }
}

impl<F, W: Write> Render<F, DetectResult> for JsonLineOutput<W> {
  type Error = OutputError;

  fn render_result(&self, _frame: &F, result: &DetectResult) -> Result<(), Self::Error> {
    let report = Report::build(self.variant, result, self.threshold, &self.info);
    debug!("预测结果: {:?}", report.predicted_class);
    let mut writer = self.writer.lock().map_err(|_| OutputError::Poisoned)?;
    write_line(&mut *writer, &report)
  }
}
