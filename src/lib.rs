// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod args;
pub mod frame;
pub mod info;
pub mod input;
pub mod model;
pub mod output;
pub mod task;

use std::path::PathBuf;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 两个入口程序的差异：模型文件、`model_type` 字段以及是否输出边界框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
  /// 检测模式，模型按默认阈值推理，结果再按用户阈值过滤
  Detection,
  /// 图像模式，模型直接按用户阈值推理，并输出边界框
  Image,
}

impl Variant {
  pub fn model_type(&self) -> &'static str {
    match self {
      Variant::Detection => "detection",
      Variant::Image => "image",
    }
  }

  pub fn default_model_file(&self) -> &'static str {
    match self {
      Variant::Detection => "best1.onnx",
      Variant::Image => "best.onnx",
    }
  }

  pub fn usage_message(&self) -> &'static str {
    match self {
      Variant::Detection => "Gunakan argumen: image <path_gambar> [conf_threshold]",
      Variant::Image => "Hanya prediksi gambar yang didukung dengan YOLO",
    }
  }

  /// 模型推理阶段使用的置信度阈值
  pub fn inference_confidence(&self, threshold: f32) -> f32 {
    match self {
      Variant::Detection => model::DEFAULT_CONFIDENCE,
      Variant::Image => threshold,
    }
  }

  pub fn with_boxes(&self) -> bool {
    matches!(self, Variant::Image)
  }
}

/// 日志写到标准错误，标准输出只留给 JSON 结果；级别由 `IKAN_LOG` 控制，默认 warn
pub fn init_tracing() {
  let filter = tracing_subscriber::EnvFilter::try_from_env("IKAN_LOG")
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(filter)
    .init();
}

/// 与可执行文件同目录的资源路径
pub fn asset_path(name: &str) -> PathBuf {
  std::env::current_exe()
    .ok()
    .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
    .unwrap_or_else(|| PathBuf::from(name))
}
