// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/draw.rs - 检测结果覆盖层绘制
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

use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::{Rgb, RgbImage, imageops::FilterType};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use tracing::debug;

use crate::{
  input::LoadError,
  output::{Marker, markers},
  view::ViewState,
};

// 覆盖层样式常量
const LABEL_FONT_SIZE: f32 = 17.0;
const LABEL_OFFSET_X: i32 = -5;
const LABEL_OFFSET_EM: f32 = 1.5; // 标签位于边框上方 1.5em
const BORDER_THICKNESS: u32 = 4;
const MARKER_COLOR: [u8; 3] = [0x1a, 0xc7, 0x1a]; // 绿色

pub struct Draw<'a> {
  font_size: f32,
  border_thickness: u32,
  color: [u8; 3],
  font: FontRef<'a>,
}

impl<'a> Draw<'a> {
  pub fn new() -> Result<Self, InvalidFont> {
    let font_data = include_bytes!("../../assets/font.ttf");
    let font = FontRef::try_from_slice(font_data)?;
    Ok(Self {
      font_size: LABEL_FONT_SIZE,
      border_thickness: BORDER_THICKNESS,
      color: MARKER_COLOR,
      font,
    })
  }

  pub fn with_color(mut self, color: [u8; 3]) -> Self {
    self.color = color;
    self
  }

  // 边框向内加粗，宽高不足时停止；坐标先裁剪到图像范围内
  fn draw_marker(&self, image: &mut RgbImage, marker: &Marker) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let [x, y, width, height] = marker.rect.to_array();
    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
      debug!("跳过非有限坐标的标记: {}", marker.caption);
      return;
    }

    let (x_min, y_min) = (x.round(), y.round());
    let (x_max, y_max) = ((x + width.max(0.0)).round(), (y + height.max(0.0)).round());
    if x_min >= w || y_min >= h || x_max <= 0.0 || y_max <= 0.0 {
      debug!("标记在图像之外: {}", marker.caption);
      return;
    }
    let (x_min, y_min) = (x_min.clamp(0.0, w), y_min.clamp(0.0, h));
    let (x_max, y_max) = (x_max.clamp(0.0, w), y_max.clamp(0.0, h));

    let x = x_min as i32;
    let y = y_min as i32;
    let width = (x_max - x_min) as u32;
    let height = (y_max - y_min) as u32;
    let color = Rgb(self.color);

    for t in 0..self.border_thickness {
      let (w, h) = (width.saturating_sub(2 * t), height.saturating_sub(2 * t));
      if w == 0 || h == 0 {
        break;
      }
      let rect = Rect::at(x + t as i32, y + t as i32).of_size(w, h);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label_y = y.saturating_sub((LABEL_OFFSET_EM * self.font_size).round() as i32);
    draw_text_mut(
      image,
      color,
      x.saturating_add(LABEL_OFFSET_X),
      label_y,
      PxScale::from(self.font_size),
      &self.font,
      &marker.caption,
    );
  }

  pub fn draw_markers(&self, image: &mut RgbImage, markers: &[Marker]) {
    for marker in markers {
      self.draw_marker(image, marker);
    }
  }

  /// 按渲染尺寸缩放图像并绘制标记；没有图像时返回 None
  pub fn draw_view(&self, view: &ViewState) -> Result<Option<RgbImage>, LoadError> {
    let Some(display) = view.image() else {
      return Ok(None);
    };

    let decoded = display.decode()?;
    let mut image = match view.rendered_size() {
      Some(size) => {
        let width = (size.width.round() as u32).max(1);
        let height = (size.height.round() as u32).max(1);
        debug!(
          "缩放 {}x{} -> {}x{}",
          decoded.pixels.width(),
          decoded.pixels.height(),
          width,
          height
        );
        image::imageops::resize(&decoded.pixels, width, height, FilterType::Triangle)
      }
      None => decoded.pixels,
    };

    self.draw_markers(&mut image, &markers(view));
    Ok(Some(image))
  }
}
