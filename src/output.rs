// 该文件是 Kanjian （看见） 项目的一部分。
// src/output.rs - 输出定义
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

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::geometry::BoundingBox;
use crate::view::ViewState;
use crate::{FromUrl, FromUrlWithScheme};

pub trait Render: Sized {
  type Error;
  fn render_view(&self, view: &ViewState) -> Result<(), Self::Error>;
}

impl<R: Render> Render for Vec<R> {
  type Error = R::Error;

  fn render_view(&self, view: &ViewState) -> Result<(), Self::Error> {
    for output in self {
      output.render_view(view)?;
    }
    Ok(())
  }
}

/// 覆盖层上的一个标记：渲染坐标系下的矩形和标签文本
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
  pub rect: BoundingBox,
  pub class_label: String,
  pub caption: String,
}

/// 标签文本：类别名加百分比置信度（保留一位小数）
pub fn marker_caption(class_label: &str, score: f32) -> String {
  format!("{} {:.1}%", class_label, score * 100.0)
}

/// 每个检测结果生成一个标记，每次状态更新都重新生成
pub fn markers(view: &ViewState) -> Vec<Marker> {
  view
    .detections()
    .iter()
    .map(|d| Marker {
      rect: d.bbox,
      class_label: d.class_label.clone(),
      caption: marker_caption(&d.class_label, d.score),
    })
    .collect()
}

/// 输出路径中的 `{stem}` 替换为当前图像的文件名（不含扩展名）
pub(crate) fn expand_output_path(template: &Path, view: &ViewState) -> PathBuf {
  let template = template.to_string_lossy();
  if !template.contains("{stem}") {
    return PathBuf::from(template.into_owned());
  }
  let stem = view
    .selected_name()
    .and_then(|name| Path::new(name).file_stem())
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| format!("selection-{}", view.generation()));
  PathBuf::from(template.replace("{stem}", &stem))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  Ok(())
}

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

mod report;
pub use self::report::{ReportError, ReportOutput, ViewReport};

mod console;
pub use self::console::ConsoleOutput;

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("报告输出错误: {0}")]
  ReportError(#[from] ReportError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  ReportOutput(ReportOutput),
  ConsoleOutput(ConsoleOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      ReportOutput::SCHEME => {
        let output = ReportOutput::from_url(url)?;
        Ok(OutputWrapper::ReportOutput(output))
      }
      ConsoleOutput::SCHEME => {
        let Ok(output) = ConsoleOutput::from_url(url);
        Ok(OutputWrapper::ConsoleOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render_view(&self, view: &ViewState) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => {
        output.render_view(view).map_err(OutputError::from)
      }
      OutputWrapper::ReportOutput(output) => output.render_view(view).map_err(OutputError::from),
      OutputWrapper::ConsoleOutput(output) => {
        let Ok(()) = output.render_view(view);
        Ok(())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    geometry::Size,
    input::DisplayImage,
    model::Detection,
    view::ViewEvent,
  };

  fn view_with(detections: Vec<Detection>) -> ViewState {
    let mut view = ViewState::new();
    view.apply(ViewEvent::SelectionStarted {
      generation: 1,
      name: "street.jpg".to_string(),
    });
    view.apply(ViewEvent::ImageRead {
      generation: 1,
      image: DisplayImage::new("photos/street.jpg", "data:image/jpeg;base64,"),
    });
    let labels = detections.iter().map(|d| d.class_label.clone()).collect();
    view.apply(ViewEvent::InferenceCompleted {
      generation: 1,
      detections,
      labels,
      rendered_size: Some(Size::new(400.0, 300.0)),
    });
    view
  }

  #[test]
  fn caption_shows_percentage_with_one_decimal() {
    assert_eq!(marker_caption("person", 0.873), "person 87.3%");
    assert_eq!(marker_caption("dog", 1.0), "dog 100.0%");
  }

  #[test]
  fn one_marker_per_detection() {
    let view = view_with(vec![
      Detection::new("person", 0.873, BoundingBox::new(50.0, 50.0, 25.0, 25.0)),
      Detection::new("dog", 0.5, BoundingBox::new(1.0, 2.0, 3.0, 4.0)),
    ]);
    let markers = markers(&view);
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].rect, BoundingBox::new(50.0, 50.0, 25.0, 25.0));
    assert!(markers[0].caption.contains("87.3"));
  }

  #[test]
  fn no_detections_no_markers() {
    let view = view_with(vec![]);
    assert!(markers(&view).is_empty());
    assert!(view.detected_labels().is_empty());
  }

  #[test]
  fn stem_placeholder_uses_image_name() {
    let view = view_with(vec![]);
    assert_eq!(
      expand_output_path(Path::new("/out/{stem}.png"), &view),
      PathBuf::from("/out/street.png")
    );
    assert_eq!(
      expand_output_path(Path::new("/out/fixed.png"), &view),
      PathBuf::from("/out/fixed.png")
    );
  }

  #[test]
  fn console_scheme_is_dispatched() {
    let url = Url::parse("console:").unwrap();
    let output = OutputWrapper::from_url(&url).unwrap();
    assert!(matches!(output, OutputWrapper::ConsoleOutput(_)));
    assert!(output.render_view(&view_with(vec![])).is_ok());
  }

  #[test]
  fn unknown_output_scheme_is_rejected() {
    let url = Url::parse("rtsp://localhost/stream").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch)
    ));
  }
}
