// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/model/yolo.rs - ONNX Runtime 上的 YOLO 检测模型
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

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::TensorRef;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::AsNchwFrame,
  model::{
    DEFAULT_CONFIDENCE, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS, DetectItem, DetectResult,
    MetadataError, Model, ModelMetadata, decode_output, non_max_suppression,
  },
};

/// Ultralytics 导出时写入的元数据键
const METADATA_KEYS: [&str; 2] = ["names", "imgsz"];

pub struct Yolo<Frame> {
  session: Session,
  input_name: String,
  output_name: String,
  metadata: ModelMetadata,
  confidence: f32,
  iou_threshold: f32,
  max_detections: usize,
  _phantom: std::marker::PhantomData<Frame>,
}

#[derive(Error, Debug)]
pub enum YoloError {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型元数据无效: {0}")]
  MetadataError(#[from] MetadataError),
  #[error("模型缺少{0}")]
  MissingTensor(&'static str),
  #[error("模型输出形状无法识别: {0:?}")]
  OutputShape(Vec<usize>),
}

impl YoloError {
  /// 会话构建各阶段的错误统一转换为 ort::Error
  fn ort(e: impl Into<ort::Error>) -> Self {
    YoloError::OrtError(e.into())
  }
}

pub struct YoloBuilder {
  model_path: PathBuf,
  confidence: f32,
  iou_threshold: f32,
  max_detections: usize,
  threads: Option<usize>,
}

impl FromUrlWithScheme for YoloBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for YoloBuilder {
  type Error = YoloError;

  /// 接受 `onnx:///path/model.onnx` 与 `file:///path/model.onnx`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let path = match url.scheme() {
      Self::SCHEME => urlencoding::decode(url.path())
        .map(|p| PathBuf::from(p.into_owned()))
        .map_err(|e| YoloError::ModelPathError(format!("{}: {}", url, e)))?,
      "file" => url
        .to_file_path()
        .map_err(|_| YoloError::ModelPathError(url.to_string()))?,
      other => {
        return Err(YoloError::ModelPathError(format!(
          "模型路径必须使用 {} 方案，实际为 {}",
          Self::SCHEME,
          other
        )));
      }
    };
    Ok(Self::new(path))
  }
}

impl YoloBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      confidence: DEFAULT_CONFIDENCE,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      max_detections: DEFAULT_MAX_DETECTIONS,
      threads: None,
    }
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn threads(mut self, threads: Option<usize>) -> Self {
    self.threads = threads;
    self
  }

  pub fn build<Frame>(self) -> Result<Yolo<Frame>, YoloError> {
    info!("加载模型文件: {}", self.model_path.display());
    if !self.model_path.exists() {
      return Err(YoloError::ModelNotFound(self.model_path));
    }

    #[allow(unused_mut)]
    let mut builder = Session::builder().map_err(YoloError::ort)?;

    #[cfg(feature = "cuda")]
    {
      use ort::execution_providers::CUDAExecutionProvider;

      info!("启用 CUDA 执行后端");
      builder = builder
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .map_err(YoloError::ort)?;
    }

    let mut builder = builder
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(YoloError::ort)?;
    if let Some(threads) = self.threads {
      builder = builder.with_intra_threads(threads).map_err(YoloError::ort)?;
    }
    let session = builder
      .commit_from_file(&self.model_path)
      .map_err(YoloError::ort)?;
    info!("模型加载完成");

    let metadata = read_metadata(&session)?;
    debug!(
      "模型输入尺寸: {:?}, 类别: {:?}",
      metadata.imgsz, metadata.names
    );

    let input_name = session
      .inputs
      .first()
      .map(|i| i.name.clone())
      .ok_or(YoloError::MissingTensor("输入"))?;
    let output_name = session
      .outputs
      .first()
      .map(|o| o.name.clone())
      .ok_or(YoloError::MissingTensor("输出"))?;
    debug!("模型输入: {}, 模型输出: {}", input_name, output_name);

    Ok(Yolo {
      session,
      input_name,
      output_name,
      metadata,
      confidence: self.confidence,
      iou_threshold: self.iou_threshold,
      max_detections: self.max_detections,
      _phantom: std::marker::PhantomData,
    })
  }
}

fn read_metadata(session: &Session) -> Result<ModelMetadata, YoloError> {
  let model_metadata = session.metadata()?;

  let mut properties = HashMap::new();
  for key in METADATA_KEYS {
    if let Ok(Some(value)) = model_metadata.custom(key) {
      properties.insert(key, value);
    }
  }
  if properties.is_empty() {
    debug!("模型未携带元数据，使用默认配置");
  }

  Ok(ModelMetadata::from_properties(|k| {
    properties.get(k).map(String::as_str)
  })?)
}

impl<Frame> Yolo<Frame> {
  /// 模型输入的 (宽, 高)
  pub fn input_size(&self) -> (u32, u32) {
    let (h, w) = self.metadata.imgsz;
    (w, h)
  }
}

impl<Frame: AsNchwFrame> Model for Yolo<Frame> {
  type Input = Frame;
  type Output = DetectResult;
  type Error = YoloError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = input.as_nchw();
    let tensor = tensor.as_standard_layout();
    let input_tensor = TensorRef::from_array_view(&tensor)?;

    debug!("执行模型推理");
    let outputs = self
      .session
      .run(ort::inputs![&self.input_name => input_tensor])?;

    debug!("获取模型输出");
    let output = outputs
      .get(self.output_name.as_str())
      .ok_or(YoloError::MissingTensor("输出"))?;
    let (shape, data) = output.try_extract_tensor::<f32>()?;
    let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

    let candidates = decode_output(data, &shape, self.metadata.num_classes(), self.confidence)?;
    debug!("阈值过滤后候选框 {} 个", candidates.len());
    let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

    let letterbox = input.letterbox();
    let items: Vec<DetectItem> = kept
      .into_iter()
      .map(|c| DetectItem {
        class_id: c.class_id,
        label: self.metadata.label(c.class_id),
        score: c.score,
        bbox: letterbox.restore(c.bbox),
      })
      .collect();

    debug!("检测到 {} 个物体", items.len());
    debug!("检测结果: {:?}", items);

    Ok(DetectResult::from(items))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_from_onnx_url_decodes_path() {
    let url = Url::parse("onnx:///opt/ikan/model%20v2.onnx").unwrap();
    let builder = YoloBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), Path::new("/opt/ikan/model v2.onnx"));
  }

  #[test]
  fn builder_from_file_url() {
    let url = Url::parse("file:///opt/ikan/best.onnx").unwrap();
    let builder = YoloBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), Path::new("/opt/ikan/best.onnx"));
  }

  #[test]
  fn builder_rejects_other_schemes() {
    let url = Url::parse("rknn:///opt/ikan/best.rknn").unwrap();
    assert!(matches!(
      YoloBuilder::from_url(&url),
      Err(YoloError::ModelPathError(_))
    ));
  }

  #[test]
  fn missing_model_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best.onnx");
    let err = YoloBuilder::new(&path)
      .build::<crate::frame::RgbNchwFrame>()
      .err()
      .unwrap();
    assert!(matches!(err, YoloError::ModelNotFound(p) if p == path));
  }

  #[test]
  fn invalid_model_keeps_runtime_error_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best.onnx");
    std::fs::write(&path, b"not a model").unwrap();
    let err = YoloBuilder::new(&path)
      .build::<crate::frame::RgbNchwFrame>()
      .err()
      .unwrap();
    assert!(matches!(err, YoloError::OrtError(_)));
    assert!(std::error::Error::source(&err).is_some());
  }
}
