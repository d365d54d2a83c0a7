// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/task.rs - 推理任务
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

use tracing::info;

use crate::{
  FromUrl, Variant,
  args::{Args, Request},
  asset_path,
  frame::RgbNchwFrame,
  info::FishInfo,
  input::ImageFileInput,
  model::{Model, Yolo, YoloBuilder},
  output::{JsonLineOutput, Render},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 取一帧，推理一次，输出一次
pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = std::time::Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("输出完成，总耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 单图预测：加载模型与鱼类信息，读取图像，推理并向标准输出写一行 JSON
pub fn predict_image(variant: Variant, args: &Args, request: &Request) -> anyhow::Result<()> {
  info!("预测模式: {}", variant.model_type());
  info!("图像路径: {}", request.path.display());
  info!("置信度阈值: {}", request.threshold);

  let builder = match &args.model {
    Some(url) => YoloBuilder::from_url(url)?,
    None => YoloBuilder::new(asset_path(variant.default_model_file())),
  };
  let model: Yolo<RgbNchwFrame> = builder
    .confidence(variant.inference_confidence(request.threshold))
    .iou_threshold(args.iou)
    .threads(args.threads)
    .build()?;

  let info = FishInfo::load(args.info_path());
  let (width, height) = model.input_size();
  let input = ImageFileInput::open(&request.path)?;
  let output = JsonLineOutput::new(std::io::stdout(), variant, request.threshold, info);

  OneShotTask.run_task(input.into_nchw(width, height), model, output)
}
