// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};
use thiserror::Error;
use url::Url;

use crate::{Variant, asset_path, info::INFO_FILE_NAME, model::DEFAULT_IOU_THRESHOLD};

/// 未指定时使用的置信度阈值
pub const DEFAULT_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug)]
pub enum ArgsError {
  /// 调用方式不符合 `image <path> [conf_threshold]`
  #[error("{0}")]
  Usage(&'static str),
  #[error("{0}")]
  Invalid(String),
}

/// Ikan 单图预测参数
///
/// 调用方式: `<程序> image <图片路径> [置信度阈值]`
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 预测类型，仅支持 image
  #[arg(value_name = "MODE")]
  pub mode: Option<String>,

  /// 图片文件路径
  #[arg(value_name = "PATH", allow_hyphen_values = true)]
  pub path: Option<PathBuf>,

  /// 置信度阈值，默认 0.3；在确认预测类型之后才解析
  #[arg(value_name = "CONF_THRESHOLD", allow_negative_numbers = true)]
  pub conf_threshold: Option<String>,

  /// 多余的位置参数，忽略
  #[arg(hide = true, num_args = 0.., allow_hyphen_values = true)]
  pub rest: Vec<String>,

  /// ONNX 模型地址，如 onnx:///opt/ikan/best.onnx，默认使用程序目录下的模型
  #[arg(long, value_name = "MODEL")]
  pub model: Option<Url>,

  /// 鱼类信息文件，默认使用程序目录下的 fish_info.json
  #[arg(long, value_name = "FILE")]
  pub info: Option<PathBuf>,

  /// NMS IOU 阈值
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou: f32,

  /// ONNX Runtime 算子内线程数
  #[arg(long, value_name = "COUNT")]
  pub threads: Option<usize>,
}

/// 校验后的单次预测请求
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  pub path: PathBuf,
  pub threshold: f32,
}

impl Args {
  /// 解析命令行；帮助与版本信息直接输出并退出
  pub fn parse_or_exit() -> Result<Self, ArgsError> {
    Self::parse_from_or_exit(std::env::args_os())
  }

  pub fn parse_from_or_exit<I, T>(itr: I) -> Result<Self, ArgsError>
  where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
  {
    match Self::try_parse_from(itr) {
      Ok(args) => Ok(args),
      Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
      Err(e) => Err(ArgsError::Invalid(clap_message(&e))),
    }
  }

  pub fn request(&self, variant: Variant) -> Result<Request, ArgsError> {
    let (Some("image"), Some(path)) = (self.mode.as_deref(), &self.path) else {
      return Err(ArgsError::Usage(variant.usage_message()));
    };
    Ok(Request {
      path: path.clone(),
      threshold: self.threshold()?,
    })
  }

  fn threshold(&self) -> Result<f32, ArgsError> {
    let Some(raw) = self.conf_threshold.as_deref() else {
      return Ok(DEFAULT_THRESHOLD);
    };
    raw
      .trim()
      .parse()
      .map_err(|_| ArgsError::Invalid(format!("could not convert string to float: '{}'", raw)))
  }

  pub fn info_path(&self) -> PathBuf {
    self
      .info
      .clone()
      .unwrap_or_else(|| asset_path(INFO_FILE_NAME))
  }
}

/// clap 错误信息的首行，去掉 `error: ` 前缀
fn clap_message(e: &clap::Error) -> String {
  let rendered = e.to_string();
  let line = rendered.lines().next().unwrap_or_default();
  line.strip_prefix("error: ").unwrap_or(line).trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Result<Args, ArgsError> {
    Args::parse_from_or_exit(std::iter::once("ikan").chain(args.iter().copied()))
  }

  #[test]
  fn image_request_with_default_threshold() {
    let args = parse(&["image", "fish.jpg"]).unwrap();
    let request = args.request(Variant::Detection).unwrap();
    assert_eq!(request.path, PathBuf::from("fish.jpg"));
    assert_eq!(request.threshold, DEFAULT_THRESHOLD);
  }

  #[test]
  fn image_request_with_explicit_threshold() {
    let args = parse(&["image", "fish.jpg", "0.55"]).unwrap();
    assert_eq!(args.request(Variant::Image).unwrap().threshold, 0.55);
  }

  #[test]
  fn extra_positionals_are_ignored() {
    let args = parse(&["image", "fish.jpg", "0.4", "extra", "more"]).unwrap();
    assert_eq!(args.request(Variant::Image).unwrap().threshold, 0.4);
  }

  #[test]
  fn wrong_mode_uses_variant_message() {
    let args = parse(&["tabular", "fish.jpg"]).unwrap();
    let err = args.request(Variant::Detection).unwrap_err();
    assert_eq!(
      err.to_string(),
      "Gunakan argumen: image <path_gambar> [conf_threshold]"
    );
    let err = args.request(Variant::Image).unwrap_err();
    assert_eq!(
      err.to_string(),
      "Hanya prediksi gambar yang didukung dengan YOLO"
    );
  }

  #[test]
  fn missing_path_is_a_usage_error() {
    let args = parse(&["image"]).unwrap();
    assert!(matches!(
      args.request(Variant::Detection),
      Err(ArgsError::Usage(_))
    ));
    let args = parse(&[]).unwrap();
    assert!(matches!(args.request(Variant::Image), Err(ArgsError::Usage(_))));
  }

  #[test]
  fn unparsable_threshold_is_invalid() {
    let args = parse(&["image", "fish.jpg", "abc"]).unwrap();
    match args.request(Variant::Image).unwrap_err() {
      ArgsError::Invalid(msg) => {
        assert_eq!(msg, "could not convert string to float: 'abc'");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn wrong_mode_is_reported_before_bad_threshold() {
    let args = parse(&["video", "x.jpg", "abc"]).unwrap();
    assert_eq!(
      args.request(Variant::Detection).unwrap_err().to_string(),
      "Gunakan argumen: image <path_gambar> [conf_threshold]"
    );
    assert_eq!(
      args.request(Variant::Image).unwrap_err().to_string(),
      "Hanya prediksi gambar yang didukung dengan YOLO"
    );
  }

  #[test]
  fn negative_threshold_is_accepted() {
    let args = parse(&["image", "fish.jpg", "-0.5"]).unwrap();
    assert_eq!(args.request(Variant::Detection).unwrap().threshold, -0.5);
  }

  #[test]
  fn path_may_start_with_hyphen() {
    let args = parse(&["image", "-fish.jpg"]).unwrap();
    let request = args.request(Variant::Image).unwrap();
    assert_eq!(request.path, PathBuf::from("-fish.jpg"));
    assert_eq!(request.threshold, DEFAULT_THRESHOLD);
  }

  #[test]
  fn unknown_option_is_invalid() {
    assert!(matches!(
      parse(&["--bogus", "image", "fish.jpg"]),
      Err(ArgsError::Invalid(msg)) if !msg.starts_with("error:")
    ));
  }

  #[test]
  fn options_override_assets() {
    let args = parse(&[
      "--model",
      "onnx:///opt/ikan/best.onnx",
      "--info",
      "/opt/ikan/info.json",
      "--iou",
      "0.5",
      "image",
      "fish.jpg",
    ])
    .unwrap();
    assert_eq!(args.model.as_ref().unwrap().scheme(), "onnx");
    assert_eq!(args.info_path(), PathBuf::from("/opt/ikan/info.json"));
    assert_eq!(args.iou, 0.5);
  }
}
