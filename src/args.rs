// 该文件是 Kanjian （看见） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use kanjian::layout::Layout;

/// Kanjian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型来源
  /// 支持格式:
  /// - 回放记录: replay:///path/to/records 或 replay:///path/to/detections.json
  /// - 外部程序: command:///path/to/detector?arg=...
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像文件，可重复；每个输入是一次新的选择
  #[arg(long, value_name = "FILE", required = true)]
  pub input: Vec<PathBuf>,

  /// 输出，可重复
  /// 支持格式:
  /// - 覆盖层图像: image:///out/{stem}.png
  /// - JSON 报告: report:///out/{stem}.json
  /// - 终端: console:
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Vec<Url>,

  /// 显示布局: fit-height:700, fit-width:W, contain:WxH, stretch:WxH, natural
  #[arg(long, default_value = "fit-height:700", value_name = "LAYOUT")]
  pub display: Layout,

  /// 每张图像最多保留的检测数
  #[arg(long, default_value = "6", value_name = "COUNT")]
  pub max_detections: usize,

  /// 单个阶段的超时时间（毫秒）
  #[arg(long, default_value = "10000", value_name = "MILLISECONDS")]
  pub stage_timeout_ms: u64,
}
