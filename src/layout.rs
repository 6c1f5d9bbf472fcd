// 该文件是 Kanjian （看见） 项目的一部分。
// src/layout.rs - 显示元素布局
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

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::geometry::Size;

/// 默认显示容器高度（像素），图像高度占满容器
pub const DEFAULT_DISPLAY_HEIGHT: f32 = 700.0;

/// 图像在显示区域中的摆放方式，决定渲染尺寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
  /// 高度固定，宽度按比例
  FitHeight(f32),
  /// 宽度固定，高度按比例
  FitWidth(f32),
  /// 等比缩放到完全放入 (w, h)
  Contain(f32, f32),
  /// 拉伸到 (w, h)
  Stretch(f32, f32),
  /// 原始尺寸
  Natural,
}

impl Default for Layout {
  fn default() -> Self {
    Layout::FitHeight(DEFAULT_DISPLAY_HEIGHT)
  }
}

impl Layout {
  /// 给定原始尺寸，返回显示元素的渲染尺寸；原始尺寸不可用时返回 None
  pub fn rendered_size(&self, natural: Size) -> Option<Size> {
    if !natural.is_usable() {
      return None;
    }
    let aspect = natural.width / natural.height;
    let size = match *self {
      Layout::FitHeight(h) => Size::new(h * aspect, h),
      Layout::FitWidth(w) => Size::new(w, w / aspect),
      Layout::Contain(w, h) => {
        let scale = (w / natural.width).min(h / natural.height);
        Size::new(natural.width * scale, natural.height * scale)
      }
      Layout::Stretch(w, h) => Size::new(w, h),
      Layout::Natural => natural,
    };
    size.is_usable().then_some(size)
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum LayoutParseError {
  #[error("未知布局: {0}")]
  UnknownKind(String),
  #[error("布局参数无效: {0}")]
  InvalidValue(String),
}

fn parse_length(value: &str) -> Result<f32, LayoutParseError> {
  value
    .trim()
    .parse::<f32>()
    .ok()
    .filter(|v| v.is_finite() && *v > 0.0)
    .ok_or_else(|| LayoutParseError::InvalidValue(value.to_string()))
}

fn parse_pair(value: &str) -> Result<(f32, f32), LayoutParseError> {
  let (w, h) = value
    .split_once('x')
    .ok_or_else(|| LayoutParseError::InvalidValue(value.to_string()))?;
  Ok((parse_length(w)?, parse_length(h)?))
}

impl FromStr for Layout {
  type Err = LayoutParseError;

  /// 格式：`fit-height:700`、`fit-width:640`、`contain:800x600`、`stretch:400x300`、`natural`
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (kind, value) = match s.split_once(':') {
      Some((kind, value)) => (kind.trim(), Some(value)),
      None => (s.trim(), None),
    };
    match (kind, value) {
      ("natural", None) => Ok(Layout::Natural),
      ("fit-height", Some(v)) => Ok(Layout::FitHeight(parse_length(v)?)),
      ("fit-width", Some(v)) => Ok(Layout::FitWidth(parse_length(v)?)),
      ("contain", Some(v)) => {
        let (w, h) = parse_pair(v)?;
        Ok(Layout::Contain(w, h))
      }
      ("stretch", Some(v)) => {
        let (w, h) = parse_pair(v)?;
        Ok(Layout::Stretch(w, h))
      }
      _ => Err(LayoutParseError::UnknownKind(s.to_string())),
    }
  }
}

impl fmt::Display for Layout {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Layout::FitHeight(h) => write!(f, "fit-height:{}", h),
      Layout::FitWidth(w) => write!(f, "fit-width:{}", w),
      Layout::Contain(w, h) => write!(f, "contain:{}x{}", w, h),
      Layout::Stretch(w, h) => write!(f, "stretch:{}x{}", w, h),
      Layout::Natural => write!(f, "natural"),
    }
  }
}
