// 该文件是 Kanjian （看见） 项目的一部分。
// src/bin/interactive.rs - 交互式选择图像
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

use std::io::{BufRead, BufReader};
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use kanjian::{
  FromUrl,
  layout::Layout,
  model::{DEFAULT_MAX_DETECTIONS, LazyModel},
  output::OutputWrapper,
  task::{Command, ContinuousTask, DetectionSession, SessionOptions, Task},
};

/// 从标准输入逐行读取图像路径，空行用于失败后复位
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型来源
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输出，可重复
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Vec<Url>,
  /// 显示布局
  #[arg(long, default_value = "fit-height:700", value_name = "LAYOUT")]
  pub display: Layout,
  /// 单个阶段的超时时间（毫秒）
  #[arg(long, default_value = "10000", value_name = "MILLISECONDS")]
  pub stage_timeout_ms: u64,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型来源: {}", args.model);
  info!("显示布局: {}", args.display);
  info!("请输入图像路径（每行一个）");

  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let options = SessionOptions {
    max_detections: DEFAULT_MAX_DETECTIONS,
    stage_timeout: Duration::from_millis(args.stage_timeout_ms),
  };
  let model = Arc::new(LazyModel::from_url(args.model));
  let mut session = DetectionSession::new(model, args.display, options);

  let commands = BufReader::new(std::io::stdin())
    .lines()
    .map_while(|line| line.ok())
    .map(|line| Command::parse_line(&line));

  ContinuousTask::default()
    .with_interrupt(true)
    .run_task(commands, &mut session, &outputs)?;

  Ok(())
}
