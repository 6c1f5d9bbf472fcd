// 该文件是 Kanjian （看见） 项目的一部分。
// src/input.rs - 图像输入
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

use image::RgbImage;
use thiserror::Error;

use crate::geometry::Size;

mod data_uri;
mod read_image_file;

pub use self::data_uri::{DataUri, DataUriError};
pub use self::read_image_file::{read_image, read_image_bytes};

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("读取图像文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("数据 URI 无效: {0}")]
  DataUri(#[from] DataUriError),
  #[error("图像解码失败: {0}")]
  Decode(#[from] image::ImageError),
}

/// 当前选中的图像：编码后的数据 URI，以及解码后才得知的原始尺寸
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayImage {
  pub name: String,
  pub data_uri: String,
  pub natural_size: Option<Size>,
}

impl DisplayImage {
  pub fn new(name: impl Into<String>, data_uri: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      data_uri: data_uri.into(),
      natural_size: None,
    }
  }

  /// 解析数据 URI 并解码像素
  pub fn decode(&self) -> Result<DecodedImage, LoadError> {
    let uri = DataUri::parse(&self.data_uri)?;
    let pixels = image::load_from_memory(&uri.data)?.to_rgb8();
    Ok(DecodedImage {
      name: self.name.clone(),
      pixels,
    })
  }
}

/// 已解码的图像，交给模型推理
#[derive(Debug, Clone)]
pub struct DecodedImage {
  pub name: String,
  pub pixels: RgbImage,
}

impl DecodedImage {
  pub fn new(name: impl Into<String>, pixels: RgbImage) -> Self {
    Self {
      name: name.into(),
      pixels,
    }
  }

  pub fn natural_size(&self) -> Size {
    let (width, height) = self.pixels.dimensions();
    Size::from_pixels(width, height)
  }

  /// 去掉扩展名的文件名，用于查找记录文件
  pub fn stem(&self) -> &str {
    std::path::Path::new(&self.name)
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or(&self.name)
  }
}
