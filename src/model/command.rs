// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/command.rs - 外部进程检测器
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

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::ImageFormat;
use tracing::{debug, error, info};
use url::Url;

use super::{Detection, Model, ModelError, replay::parse_json_records};
use crate::{FromUrl, FromUrlWithScheme, input::DecodedImage, url_file_path};

/// 调用外部检测程序
///
/// 图像以 PNG 写入子进程标准输入，子进程在标准输出中返回 JSON 检测数组。
/// 最大检测数通过 `--max-detections <N>` 传给子进程。
/// 例：`command:///opt/detect/coco_ssd.py?arg=--cpu`
#[derive(Debug, Clone)]
pub struct CommandModel {
  program: PathBuf,
  args: Vec<String>,
}

impl FromUrlWithScheme for CommandModel {
  const SCHEME: &'static str = "command";
}

impl FromUrl for CommandModel {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let program = url_file_path(url);
    if program.as_os_str().is_empty() || program == PathBuf::from("/") {
      return Err(ModelError::ModelPathError("未指定检测程序".to_string()));
    }

    let args = url
      .query_pairs()
      .filter(|(k, _)| k == "arg")
      .map(|(_, v)| v.into_owned())
      .collect();

    info!("外部检测程序: {}", program.display());
    Ok(CommandModel { program, args })
  }
}

impl CommandModel {
  pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
    }
  }

  fn encode_png(image: &DecodedImage) -> Result<Vec<u8>, ModelError> {
    let mut buffer = Cursor::new(Vec::new());
    image
      .pixels
      .write_to(&mut buffer, ImageFormat::Png)
      .map_err(|e| ModelError::Inference(format!("图像编码失败: {}", e)))?;
    Ok(buffer.into_inner())
  }
}

impl Model for CommandModel {
  fn detect(
    &self,
    image: &DecodedImage,
    max_detections: usize,
  ) -> Result<Vec<Detection>, ModelError> {
    let png = Self::encode_png(image)?;

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .arg("--max-detections")
      .arg(max_detections.to_string())
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| {
        error!("无法执行检测程序 {}: {}", self.program.display(), e);
        ModelError::Load(format!("无法执行 {}: {}", self.program.display(), e))
      })?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(&png)
        .map_err(|e| ModelError::Inference(format!("写入图像失败: {}", e)))?;
    }

    let output = child
      .wait_with_output()
      .map_err(|e| ModelError::Inference(format!("等待检测程序失败: {}", e)))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      error!("检测程序错误: {}", stderr);
      return Err(ModelError::Inference(format!(
        "检测程序退出状态 {}: {}",
        output.status,
        stderr.trim()
      )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    debug!("检测程序输出 {} 字节", stdout.len());
    parse_json_records(&stdout)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_args_are_collected_in_order() {
    let url = Url::parse("command:///opt/detect/run%20me?arg=--cpu&arg=--quiet&other=1").unwrap();
    let model = CommandModel::from_url(&url).unwrap();
    assert_eq!(model.program, PathBuf::from("/opt/detect/run me"));
    assert_eq!(model.args, vec!["--cpu".to_string(), "--quiet".to_string()]);
  }

  #[test]
  fn missing_program_is_rejected() {
    let url = Url::parse("command:///").unwrap();
    assert!(matches!(
      CommandModel::from_url(&url),
      Err(ModelError::ModelPathError(_))
    ));
  }

  #[cfg(unix)]
  #[test]
  fn failing_program_is_inference_error() {
    let model = CommandModel::new("/bin/sh", vec!["-c".to_string(), "cat > /dev/null; exit 3".to_string()]);
    let image = DecodedImage::new("a.png", image::RgbImage::new(2, 2));
    assert!(matches!(model.detect(&image, 6), Err(ModelError::Inference(_))));
  }

  #[cfg(unix)]
  #[test]
  fn stdout_json_is_parsed() {
    let script = r#"cat > /dev/null; echo '[{"bbox":[1,2,3,4],"class":"cat","score":0.8}]'"#;
    let model = CommandModel::new("/bin/sh", vec!["-c".to_string(), script.to_string()]);
    let image = DecodedImage::new("a.png", image::RgbImage::new(2, 2));
    let detections = model.detect(&image, 6).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_label, "cat");
  }
}
