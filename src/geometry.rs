// 该文件是 Kanjian （看见） 项目的一部分。
// src/geometry.rs - 尺寸与检测框
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

use serde::{Deserialize, Serialize};

/// 像素尺寸，宽高允许为小数（渲染尺寸可能不是整数）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
  pub width: f32,
  pub height: f32,
}

impl Size {
  pub fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  pub fn from_pixels(width: u32, height: u32) -> Self {
    Self {
      width: width as f32,
      height: height as f32,
    }
  }

  /// 宽高均为有限正数时才可用于缩放
  pub fn is_usable(&self) -> bool {
    self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
  }
}

/// 检测框 (x, y, width, height)，左上角为原点
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 由 [x_min, y_min, x_max, y_max] 构造
  pub fn from_corners(corners: [f32; 4]) -> Self {
    Self {
      x: corners[0],
      y: corners[1],
      width: corners[2] - corners[0],
      height: corners[3] - corners[1],
    }
  }

  /// x 与 width 按 `sx` 缩放，y 与 height 按 `sy` 缩放
  pub fn scale(&self, sx: f32, sy: f32) -> Self {
    Self {
      x: self.x * sx,
      y: self.y * sy,
      width: self.width * sx,
      height: self.height * sy,
    }
  }

  pub fn to_array(&self) -> [f32; 4] {
    [self.x, self.y, self.width, self.height]
  }
}

// 与 coco-ssd 的输出保持一致：bbox 序列化为 [x, y, width, height]
impl Serialize for BoundingBox {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_array().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for BoundingBox {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let [x, y, width, height] = <[f32; 4]>::deserialize(deserializer)?;
    Ok(BoundingBox::new(x, y, width, height))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn corners_become_width_and_height() {
    let bbox = BoundingBox::from_corners([10.0, 20.0, 40.0, 80.0]);
    assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 30.0, 60.0));
  }

  #[test]
  fn degenerate_sizes_are_not_usable() {
    assert!(Size::new(800.0, 600.0).is_usable());
    assert!(!Size::new(0.0, 600.0).is_usable());
    assert!(!Size::new(800.0, f32::NAN).is_usable());
  }

  #[test]
  fn bbox_serializes_as_array() {
    let json = serde_json::to_string(&BoundingBox::new(1.0, 2.0, 3.0, 4.0)).unwrap();
    assert_eq!(json, "[1.0,2.0,3.0,4.0]");
  }
}
