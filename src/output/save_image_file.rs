// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/save_image_file.rs - 保存覆盖层图像
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

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::LoadError,
  output::{Render, draw::Draw, ensure_parent_dir, expand_output_path},
  url_file_path,
  view::ViewState,
};

/// 把缩放到渲染尺寸、带检测框的图像写入文件，路径可包含 `{stem}`
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw<'static>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("图像加载错误: {0}")]
  LoadError(#[from] LoadError),
  #[error("字体加载错误: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Self::new(url_file_path(uri))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Result<Self, SaveImageFileError> {
    Ok(SaveImageFileOutput {
      path: path.into(),
      draw: Draw::new()?,
    })
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_view(&self, view: &ViewState) -> Result<(), Self::Error> {
    if view.failure().is_some() {
      warn!("选择失败，跳过图像输出");
      return Ok(());
    }
    let Some(image) = self.draw.draw_view(view)? else {
      warn!("没有可保存的图像");
      return Ok(());
    };

    let path = expand_output_path(&self.path, view);
    ensure_parent_dir(&path)?;
    image.save(&path)?;
    info!("保存图像到文件: {}", path.display());
    Ok(())
  }
}
