// 该文件是 Kanjian （看见） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use kanjian::{
  FromUrl,
  model::LazyModel,
  output::OutputWrapper,
  task::{DetectionSession, OneShotTask, SessionOptions, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型来源: {}", args.model);
  info!("输入图像: {} 张", args.input.len());
  info!("显示布局: {}", args.display);
  info!("最大检测数: {}", args.max_detections);

  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let options = SessionOptions {
    max_detections: args.max_detections,
    stage_timeout: Duration::from_millis(args.stage_timeout_ms),
  };
  let model = Arc::new(LazyModel::from_url(args.model));
  let mut session = DetectionSession::new(model, args.display, options);

  OneShotTask.run_task(args.input, &mut session, &outputs)?;

  Ok(())
}
