// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/replay.rs - 回放已记录的检测结果
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

use std::path::{Path, PathBuf};

use tracing::{debug, error};
use url::Url;

use super::{Detection, Model, ModelError, coco_label};
use crate::{
  FromUrl, FromUrlWithScheme, geometry::BoundingBox, input::DecodedImage, url_file_path,
};

/// 记录来源：单个文件对所有图像生效，目录则按图像文件名查找
#[derive(Debug, Clone)]
enum ReplaySource {
  File(PathBuf),
  Directory(PathBuf),
}

/// 从磁盘回放检测结果的模型
///
/// 支持两种记录格式：
/// - `<stem>.json`：coco-ssd 风格的 JSON 数组 `[{"bbox":[x,y,w,h],"class":..,"score":..}]`
/// - `<stem>.txt`：每行 `name, score, x_min, y_min, x_max, y_max`，坐标为归一化值，
///   `name` 也可以是 COCO 类别编号
#[derive(Debug, Clone)]
pub struct ReplayModel {
  source: ReplaySource,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = url_file_path(url);
    let source = if path.is_dir() {
      ReplaySource::Directory(path)
    } else if path.is_file() {
      ReplaySource::File(path)
    } else {
      error!("记录路径不存在: {}", path.display());
      return Err(ModelError::Load(format!(
        "记录路径不存在: {}",
        path.display()
      )));
    };

    debug!("回放来源: {:?}", source);
    Ok(ReplayModel { source })
  }
}

impl ReplayModel {
  pub fn from_file(path: impl Into<PathBuf>) -> Self {
    Self {
      source: ReplaySource::File(path.into()),
    }
  }

  pub fn from_directory(path: impl Into<PathBuf>) -> Self {
    Self {
      source: ReplaySource::Directory(path.into()),
    }
  }

  fn record_path(&self, image: &DecodedImage) -> Option<PathBuf> {
    match &self.source {
      ReplaySource::File(path) => Some(path.clone()),
      ReplaySource::Directory(dir) => ["json", "txt"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", image.stem(), ext)))
        .find(|p| p.is_file()),
    }
  }
}

impl Model for ReplayModel {
  fn detect(
    &self,
    image: &DecodedImage,
    max_detections: usize,
  ) -> Result<Vec<Detection>, ModelError> {
    let Some(path) = self.record_path(image) else {
      debug!("没有 {} 的检测记录", image.name);
      return Ok(Vec::new());
    };

    let content = std::fs::read_to_string(&path)
      .map_err(|e| ModelError::Inference(format!("读取记录 {} 失败: {}", path.display(), e)))?;

    let mut detections = if is_json(&path) {
      parse_json_records(&content)?
    } else {
      let (width, height) = image.pixels.dimensions();
      parse_text_records(&content, width as f32, height as f32)?
    };
    detections.truncate(max_detections);
    Ok(detections)
  }
}

fn is_json(path: &Path) -> bool {
  path
    .extension()
    .map(|ext| ext.eq_ignore_ascii_case("json"))
    .unwrap_or(false)
}

pub(crate) fn parse_json_records(content: &str) -> Result<Vec<Detection>, ModelError> {
  serde_json::from_str(content).map_err(|e| ModelError::Inference(format!("JSON 记录无效: {}", e)))
}

fn parse_text_records(content: &str, width: f32, height: f32) -> Result<Vec<Detection>, ModelError> {
  let mut detections = Vec::new();
  for (line_no, line) in content.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 6 {
      return Err(ModelError::Inference(format!(
        "第 {} 行字段数应为 6, 实际为 {}",
        line_no + 1,
        fields.len()
      )));
    }

    let mut numbers = [0f32; 5];
    for (slot, field) in numbers.iter_mut().zip(&fields[1..]) {
      *slot = field.parse().map_err(|_| {
        ModelError::Inference(format!("第 {} 行数值无效: {}", line_no + 1, field))
      })?;
    }

    let name = match fields[0].parse::<u32>() {
      Ok(id) => coco_label(id)
        .map(str::to_string)
        .unwrap_or_else(|| fields[0].to_string()),
      Err(_) => fields[0].to_string(),
    };

    let [score, x_min, y_min, x_max, y_max] = numbers;
    let bbox = BoundingBox::from_corners([x_min * width, y_min * height, x_max * width, y_max * height]);
    detections.push(Detection::new(name, score, bbox));
  }
  Ok(detections)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  #[test]
  fn text_records_are_scaled_to_pixels() {
    let content = "dog, 0.9000, 0.1000, 0.2000, 0.6000, 0.7000\n\n16, 0.5, 0, 0, 0.5, 0.5\n";
    let detections = parse_text_records(content, 200.0, 100.0).unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_label, "dog");
    let bbox = detections[0].bbox;
    assert!((bbox.x - 20.0).abs() < 1e-3);
    assert!((bbox.y - 20.0).abs() < 1e-3);
    assert!((bbox.width - 100.0).abs() < 1e-3);
    assert!((bbox.height - 50.0).abs() < 1e-3);
    assert_eq!(detections[1].class_label, "dog");
  }

  #[test]
  fn malformed_text_record_is_an_inference_error() {
    assert!(matches!(
      parse_text_records("dog, 0.9, 0.1", 10.0, 10.0),
      Err(ModelError::Inference(_))
    ));
    assert!(matches!(
      parse_text_records("dog, x, 0, 0, 1, 1", 10.0, 10.0),
      Err(ModelError::Inference(_))
    ));
  }

  #[test]
  fn missing_record_in_directory_means_no_detections() {
    let model = ReplayModel::from_directory(std::env::temp_dir().join("kanjian-no-such-records"));
    let image = DecodedImage::new("street.jpg", RgbImage::new(2, 2));
    assert!(model.detect(&image, 6).unwrap().is_empty());
  }
}
