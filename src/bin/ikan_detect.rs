// 该文件是 Ikan （鱼讯） 项目的一部分。
// src/bin/ikan_detect.rs - 单图鱼类预测，检测模式：模型按默认阈值推理，再按用户阈值过滤
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

use std::process::ExitCode;

use anyhow::Result;
use tracing::error;

use ikan::{Variant, args::Args, output::ErrorReport, task::predict_image};

const VARIANT: Variant = Variant::Detection;

fn run() -> Result<()> {
  let args = Args::parse_or_exit()?;
  let request = args.request(VARIANT)?;
  predict_image(VARIANT, &args, &request)
}

fn main() -> ExitCode {
  ikan::init_tracing();

  match run() {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      if let Err(write_err) = ErrorReport::new(e.to_string()).write_line(&mut std::io::stdout()) {
        error!("无法写出结果: {}", write_err);
      }
      ExitCode::FAILURE
    }
  }
}
