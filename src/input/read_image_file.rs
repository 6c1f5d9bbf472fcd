// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/read_image_file.rs - 图像文件读取
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

use std::path::Path;

use tracing::{debug, error};

use super::{DataUri, DisplayImage, LoadError};

const FALLBACK_MIME: &str = "application/octet-stream";

/// 读取用户选择的文件并转为数据 URI，只尝试一次，不校验类型
pub fn read_image(path: &Path) -> Result<DisplayImage, LoadError> {
  let bytes = std::fs::read(path).map_err(|e| {
    error!("读取文件 {} 失败: {}", path.display(), e);
    e
  })?;
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  Ok(read_image_bytes(name, bytes))
}

pub fn read_image_bytes(name: impl Into<String>, bytes: Vec<u8>) -> DisplayImage {
  let mime = image::guess_format(&bytes)
    .map(|format| format.to_mime_type())
    .unwrap_or(FALLBACK_MIME);
  debug!("图像数据 {} 字节, 类型 {}", bytes.len(), mime);
  DisplayImage::new(name, DataUri::new(mime, bytes).encode())
}
