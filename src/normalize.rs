// 该文件是 Kanjian （看见） 项目的一部分。
// src/normalize.rs - 检测框坐标归一化
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

use crate::{geometry::Size, model::Detection};

/// 把原图像素坐标系下的检测框换算到显示元素的渲染像素坐标系。
///
/// x 与 width 乘以 `rendered.width / source.width`，y 与 height 乘以
/// `rendered.height / source.height`。任一尺寸缺失（或为零）时原样返回。
pub fn normalize_detections(
  detections: &[Detection],
  source: Option<Size>,
  rendered: Option<Size>,
) -> Vec<Detection> {
  let (Some(source), Some(rendered)) = (source, rendered) else {
    return detections.to_vec();
  };
  if !source.is_usable() || !rendered.is_usable() {
    return detections.to_vec();
  }

  let sx = rendered.width / source.width;
  let sy = rendered.height / source.height;

  detections
    .iter()
    .map(|d| Detection {
      bbox: d.bbox.scale(sx, sy),
      ..d.clone()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::BoundingBox;

  fn dog(x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection::new("dog", 0.9, BoundingBox::new(x, y, w, h))
  }

  #[test]
  fn halves_box_when_rendered_at_half_size() {
    let out = normalize_detections(
      &[dog(100.0, 100.0, 50.0, 50.0)],
      Some(Size::new(800.0, 600.0)),
      Some(Size::new(400.0, 300.0)),
    );
    assert_eq!(out[0].bbox, BoundingBox::new(50.0, 50.0, 25.0, 25.0));
    assert_eq!(out[0].class_label, "dog");
    assert_eq!(out[0].score, 0.9);
  }

  #[test]
  fn axes_are_scaled_independently() {
    let out = normalize_detections(
      &[dog(10.0, 10.0, 20.0, 40.0)],
      Some(Size::new(100.0, 100.0)),
      Some(Size::new(300.0, 50.0)),
    );
    assert_eq!(out[0].bbox, BoundingBox::new(30.0, 5.0, 60.0, 20.0));
  }

  #[test]
  fn missing_sizes_pass_through() {
    let input = vec![dog(1.0, 2.0, 3.0, 4.0)];
    let size = Some(Size::new(10.0, 10.0));
    assert_eq!(normalize_detections(&input, None, size), input);
    assert_eq!(normalize_detections(&input, size, None), input);
    assert_eq!(
      normalize_detections(&input, Some(Size::new(0.0, 10.0)), size),
      input
    );
  }

  #[test]
  fn empty_input_stays_empty() {
    let out = normalize_detections(&[], Some(Size::new(8.0, 6.0)), Some(Size::new(4.0, 3.0)));
    assert!(out.is_empty());
  }
}
