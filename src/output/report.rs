// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/report.rs - JSON 视图报告
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

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  geometry::Size,
  output::{Marker, Render, ensure_parent_dir, expand_output_path, markers},
  url_file_path,
  view::{Failure, Phase, ViewState},
};

#[derive(Error, Debug)]
pub enum ReportError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ImageReport<'a> {
  name: &'a str,
  natural_size: Option<Size>,
  rendered_size: Option<Size>,
}

#[derive(Serialize)]
pub struct ViewReport<'a> {
  generated_at: String,
  generation: u64,
  phase: &'static str,
  button_label: &'static str,
  selected: Option<&'a str>,
  image: Option<ImageReport<'a>>,
  markers: Vec<Marker>,
  detected_objects: &'a [String],
  caption: Option<String>,
  failure: Option<&'a Failure>,
}

impl<'a> ViewReport<'a> {
  pub fn from_view(view: &'a ViewState) -> Self {
    let phase = match view.phase() {
      Phase::Ready => "ready",
      Phase::Loading => "loading",
      Phase::Failed(_) => "failed",
    };
    ViewReport {
      generated_at: Utc::now().to_rfc3339(),
      generation: view.generation(),
      phase,
      button_label: view.button_label(),
      selected: view.selected_name(),
      image: view.image().map(|image| ImageReport {
        name: &image.name,
        natural_size: image.natural_size,
        rendered_size: view.rendered_size(),
      }),
      markers: markers(view),
      detected_objects: view.detected_labels(),
      caption: view.detected_objects_caption(),
      failure: view.failure(),
    }
  }
}

/// 把视图快照写成 JSON 文件，路径可包含 `{stem}`
pub struct ReportOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for ReportOutput {
  const SCHEME: &'static str = "report";
}

impl FromUrl for ReportOutput {
  type Error = ReportError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReportError::SchemeMismatch);
    }
    Ok(Self::new(url_file_path(url)))
  }
}

impl ReportOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl Render for ReportOutput {
  type Error = ReportError;

  fn render_view(&self, view: &ViewState) -> Result<(), Self::Error> {
    let path = expand_output_path(&self.path, view);
    ensure_parent_dir(&path)?;
    let report = ViewReport::from_view(view);
    std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
    info!("写入报告: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    geometry::BoundingBox,
    model::Detection,
    view::{FailureKind, ViewEvent},
  };

  fn started(generation: u64) -> ViewEvent {
    ViewEvent::SelectionStarted {
      generation,
      name: "street.png".to_string(),
    }
  }

  #[test]
  fn report_lists_markers_and_caption() {
    let mut view = ViewState::new();
    view.apply(started(1));
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

    let json = serde_json::to_value(ViewReport::from_view(&view)).unwrap();
    assert_eq!(json["phase"], "ready");
    assert_eq!(json["markers"][0]["caption"], "person 87.3%");
    assert_eq!(json["markers"][0]["rect"][0], 50.0);
    assert_eq!(json["caption"], "Detected Objects: person");
    assert!(json["failure"].is_null());
  }

  #[test]
  fn report_carries_failure_kind() {
    let mut view = ViewState::new();
    view.apply(started(1));
    view.apply(ViewEvent::Failed {
      generation: 1,
      failure: Failure::new(FailureKind::InferenceTimedOut, "10s"),
    });

    let json = serde_json::to_value(ViewReport::from_view(&view)).unwrap();
    assert_eq!(json["phase"], "failed");
    assert_eq!(json["failure"]["kind"], "inference_timed_out");
    assert_eq!(json["button_label"], "Select Image");
    assert_eq!(json["selected"], "street.png");
    assert!(json["image"].is_null());
  }
}
