// 该文件是 Kanjian （看见） 项目的一部分。
// src/view.rs - 视图状态与状态转移
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

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::{geometry::Size, input::DisplayImage, model::Detection};

pub const SELECT_BUTTON_LABEL: &str = "Select Image";
pub const LOADING_BUTTON_LABEL: &str = "Recognizing...";
pub const DETECTED_OBJECTS_PREFIX: &str = "Detected Objects: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  ReadFailed,
  DecodeFailed,
  DecodeTimedOut,
  ModelLoadFailed,
  InferenceFailed,
  InferenceTimedOut,
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      FailureKind::ReadFailed => "无法读取图像文件",
      FailureKind::DecodeFailed => "无法解码图像",
      FailureKind::DecodeTimedOut => "图像解码超时",
      FailureKind::ModelLoadFailed => "无法加载检测模型",
      FailureKind::InferenceFailed => "目标检测失败",
      FailureKind::InferenceTimedOut => "目标检测超时",
    };
    f.write_str(text)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
  pub kind: FailureKind,
  pub message: String,
}

impl Failure {
  pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }
}

impl fmt::Display for Failure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.kind, self.message)
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
  #[default]
  Ready,
  Loading,
  Failed(Failure),
}

/// 驱动视图的离散事件，除 `Dismissed` 外都带有所属选择的代号
#[derive(Debug, Clone)]
pub enum ViewEvent {
  /// `name` 为所选文件名，读取失败时结果仍归属于它
  SelectionStarted {
    generation: u64,
    name: String,
  },
  ImageRead {
    generation: u64,
    image: DisplayImage,
  },
  ImageDecoded {
    generation: u64,
    natural_size: Size,
  },
  /// `detections` 已换算到 `rendered_size` 坐标系，`labels` 为模型给出的类别名
  InferenceCompleted {
    generation: u64,
    detections: Vec<Detection>,
    labels: Vec<String>,
    rendered_size: Option<Size>,
  },
  Failed {
    generation: u64,
    failure: Failure,
  },
  Dismissed,
}

impl ViewEvent {
  pub fn generation(&self) -> Option<u64> {
    match self {
      ViewEvent::SelectionStarted { generation, .. }
      | ViewEvent::ImageRead { generation, .. }
      | ViewEvent::ImageDecoded { generation, .. }
      | ViewEvent::InferenceCompleted { generation, .. }
      | ViewEvent::Failed { generation, .. } => Some(*generation),
      ViewEvent::Dismissed => None,
    }
  }
}

/// 每次选择都会整体重建的视图状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
  generation: u64,
  phase: Phase,
  selected: Option<String>,
  image: Option<DisplayImage>,
  rendered_size: Option<Size>,
  detections: Vec<Detection>,
  detected_labels: Vec<String>,
}

impl ViewState {
  pub fn new() -> Self {
    Self::default()
  }

  /// 应用事件；过期代号的事件被丢弃并返回 false
  pub fn apply(&mut self, event: ViewEvent) -> bool {
    match event {
      ViewEvent::SelectionStarted { generation, name } => {
        if generation <= self.generation {
          debug!("忽略旧的选择事件: {} <= {}", generation, self.generation);
          return false;
        }
        self.generation = generation;
        self.phase = Phase::Loading;
        self.selected = Some(name);
        self.image = None;
        self.rendered_size = None;
        self.detections.clear();
        self.detected_labels.clear();
      }
      ViewEvent::Dismissed => {
        if !matches!(self.phase, Phase::Failed(_)) {
          return false;
        }
        self.phase = Phase::Ready;
      }
      ViewEvent::ImageRead { generation, image } => {
        if !self.accepts(generation) {
          return false;
        }
        self.image = Some(image);
      }
      ViewEvent::ImageDecoded {
        generation,
        natural_size,
      } => {
        if !self.accepts(generation) {
          return false;
        }
        match self.image.as_mut() {
          Some(image) => image.natural_size = Some(natural_size),
          None => return false,
        }
      }
      ViewEvent::InferenceCompleted {
        generation,
        detections,
        labels,
        rendered_size,
      } => {
        if !self.accepts(generation) {
          return false;
        }
        self.rendered_size = rendered_size;
        self.detections = detections;
        self.detected_labels = labels;
        self.phase = Phase::Ready;
      }
      ViewEvent::Failed {
        generation,
        failure,
      } => {
        if !self.accepts(generation) {
          return false;
        }
        self.detections.clear();
        self.detected_labels.clear();
        self.phase = Phase::Failed(failure);
      }
    }
    true
  }

  /// 只有当前代号且仍在加载中的阶段结果才会被接受
  fn accepts(&self, generation: u64) -> bool {
    let current = generation == self.generation && self.phase == Phase::Loading;
    if !current {
      debug!(
        "丢弃过期事件: 代号 {} (当前 {}, {:?})",
        generation, self.generation, self.phase
      );
    }
    current
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn phase(&self) -> &Phase {
    &self.phase
  }

  pub fn is_loading(&self) -> bool {
    self.phase == Phase::Loading
  }

  /// 当前选择的文件名，在图像读取之前就已确定
  pub fn selected_name(&self) -> Option<&str> {
    self.selected.as_deref()
  }

  pub fn image(&self) -> Option<&DisplayImage> {
    self.image.as_ref()
  }

  /// 检测框所在的渲染坐标系尺寸；为 None 时检测框仍是原图坐标
  pub fn rendered_size(&self) -> Option<Size> {
    self.rendered_size
  }

  pub fn detections(&self) -> &[Detection] {
    &self.detections
  }

  pub fn detected_labels(&self) -> &[String] {
    &self.detected_labels
  }

  pub fn failure(&self) -> Option<&Failure> {
    match &self.phase {
      Phase::Failed(failure) => Some(failure),
      _ => None,
    }
  }

  pub fn button_label(&self) -> &'static str {
    if self.is_loading() {
      LOADING_BUTTON_LABEL
    } else {
      SELECT_BUTTON_LABEL
    }
  }

  pub fn show_spinner(&self) -> bool {
    self.is_loading()
  }

  pub fn detected_objects_caption(&self) -> Option<String> {
    if self.detected_labels.is_empty() {
      return None;
    }
    Some(format!(
      "{}{}",
      DETECTED_OBJECTS_PREFIX,
      self.detected_labels.join(", ")
    ))
  }
}
