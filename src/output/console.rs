// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/console.rs - 终端输出
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

use std::convert::Infallible;

use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, markers},
  view::ViewState,
};

/// 把视图打印到标准输出
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = Infallible;

  fn from_url(_: &Url) -> Result<Self, Self::Error> {
    Ok(ConsoleOutput)
  }
}

impl ConsoleOutput {
  /// 视图的文本形式：失败时只给出错误，不列出标记
  pub fn lines(view: &ViewState) -> Vec<String> {
    let mut lines = vec![format!("[{}]", view.button_label())];
    if let Some(name) = view.selected_name() {
      lines.push(format!("图像: {}", name));
    }
    if let Some(failure) = view.failure() {
      lines.push(format!("错误: {}", failure));
      return lines;
    }
    for marker in markers(view) {
      lines.push(format!(
        "  - {} at ({:.0}, {:.0}, {:.0}x{:.0})",
        marker.caption, marker.rect.x, marker.rect.y, marker.rect.width, marker.rect.height
      ));
    }
    if let Some(caption) = view.detected_objects_caption() {
      lines.push(caption);
    }
    lines
  }
}

impl Render for ConsoleOutput {
  type Error = Infallible;

  fn render_view(&self, view: &ViewState) -> Result<(), Self::Error> {
    for line in Self::lines(view) {
      println!("{}", line);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    geometry::BoundingBox,
    model::Detection,
    view::{Failure, FailureKind, ViewEvent},
  };

  fn started() -> ViewEvent {
    ViewEvent::SelectionStarted {
      generation: 1,
      name: "street.png".to_string(),
    }
  }

  #[test]
  fn ready_view_lists_markers_and_caption() {
    let mut view = ViewState::new();
    view.apply(started());
    view.apply(ViewEvent::InferenceCompleted {
      generation: 1,
      detections: vec![Detection::new(
        "person",
        0.873,
        BoundingBox::new(50.0, 50.0, 25.0, 25.0),
      )],
      labels: vec!["person".to_string()],
      rendered_size: None,
    });

    assert_eq!(
      ConsoleOutput::lines(&view),
      vec![
        "[Select Image]".to_string(),
        "图像: street.png".to_string(),
        "  - person 87.3% at (50, 50, 25x25)".to_string(),
        "Detected Objects: person".to_string(),
      ]
    );
  }

  #[test]
  fn failed_view_prints_error_only() {
    let mut view = ViewState::new();
    view.apply(started());
    view.apply(ViewEvent::Failed {
      generation: 1,
      failure: Failure::new(FailureKind::ReadFailed, "not found"),
    });

    let lines = ConsoleOutput::lines(&view);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "图像: street.png");
    assert!(lines[2].starts_with("错误: "));
    assert!(lines[2].contains("not found"));
    assert!(ConsoleOutput.render_view(&view).is_ok());
  }

  #[test]
  fn loading_view_shows_recognizing_label() {
    let mut view = ViewState::new();
    view.apply(started());
    assert_eq!(ConsoleOutput::lines(&view)[0], "[Recognizing...]");
  }
}
