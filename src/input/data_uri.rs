// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/data_uri.rs - base64 数据 URI
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

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

#[derive(Error, Debug)]
pub enum DataUriError {
  #[error("缺少 data: 前缀")]
  MissingScheme,
  #[error("缺少数据分隔符 ','")]
  MissingSeparator,
  #[error("仅支持 base64 编码")]
  NotBase64,
  #[error("base64 解码失败: {0}")]
  Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
  pub mime: String,
  pub data: Vec<u8>,
}

impl DataUri {
  pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
    Self {
      mime: mime.into(),
      data,
    }
  }

  pub fn encode(&self) -> String {
    format!(
      "{}{}{},{}",
      DATA_SCHEME,
      self.mime,
      BASE64_MARKER,
      BASE64.encode(&self.data)
    )
  }

  pub fn parse(uri: &str) -> Result<Self, DataUriError> {
    let rest = uri
      .strip_prefix(DATA_SCHEME)
      .ok_or(DataUriError::MissingScheme)?;
    let (header, payload) = rest
      .split_once(',')
      .ok_or(DataUriError::MissingSeparator)?;
    let mime = header
      .strip_suffix(BASE64_MARKER)
      .ok_or(DataUriError::NotBase64)?;
    let data = BASE64.decode(payload)?;
    Ok(Self::new(mime, data))
  }
}
