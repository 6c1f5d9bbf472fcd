// 该文件是 Kanjian （看见） 项目的一部分。
// src/task/session.rs - 检测会话
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
use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
  mpsc::{self, Receiver, RecvTimeoutError, Sender},
};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{
  geometry::Size,
  input::{DisplayImage, LoadError, read_image},
  layout::Layout,
  model::{DEFAULT_MAX_DETECTIONS, Detection, LazyModel, ModelError, run_inference},
  normalize::normalize_detections,
  view::{Failure, FailureKind, ViewEvent, ViewState},
};

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
  pub max_detections: usize,
  /// 单个阶段（读取、解码、推理）无进展的最长等待时间
  pub stage_timeout: Duration,
}

impl Default for SessionOptions {
  fn default() -> Self {
    Self {
      max_detections: DEFAULT_MAX_DETECTIONS,
      stage_timeout: DEFAULT_STAGE_TIMEOUT,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
  Reading,
  Decoding,
  Inferring,
}

enum StageOutcome {
  Read(DisplayImage),
  Decoded(Size),
  Detected(Vec<Detection>),
  Failed(Failure),
}

struct StageMessage {
  generation: u64,
  outcome: StageOutcome,
}

/// 一次选择的后台流水线：读取 → 解码 → 推理，每个阶段的结果都带代号发回
struct Worker {
  generation: u64,
  path: PathBuf,
  model: Arc<LazyModel>,
  current: Arc<AtomicU64>,
  tx: Sender<StageMessage>,
  max_detections: usize,
}

impl Worker {
  fn superseded(&self) -> bool {
    self.current.load(Ordering::SeqCst) != self.generation
  }

  fn send(&self, outcome: StageOutcome) {
    let message = StageMessage {
      generation: self.generation,
      outcome,
    };
    if self.tx.send(message).is_err() {
      debug!("会话已结束，丢弃代号 {} 的结果", self.generation);
    }
  }

  fn fail(&self, kind: FailureKind, message: impl ToString) {
    self.send(StageOutcome::Failed(Failure::new(kind, message.to_string())));
  }

  fn run(self) {
    let image = match read_image(&self.path) {
      Ok(image) => image,
      Err(e) => return self.fail(FailureKind::ReadFailed, e),
    };
    self.send(StageOutcome::Read(image.clone()));
    if self.superseded() {
      debug!("代号 {} 已被取代，停止解码", self.generation);
      return;
    }

    let decoded = match image.decode() {
      Ok(decoded) => decoded,
      Err(e @ (LoadError::Decode(_) | LoadError::DataUri(_))) => {
        return self.fail(FailureKind::DecodeFailed, e);
      }
      Err(e) => return self.fail(FailureKind::ReadFailed, e),
    };
    self.send(StageOutcome::Decoded(decoded.natural_size()));
    if self.superseded() {
      debug!("代号 {} 已被取代，跳过推理", self.generation);
      return;
    }

    let model = match self.model.get() {
      Ok(model) => model,
      Err(e) => return self.fail(FailureKind::ModelLoadFailed, e),
    };
    match run_inference(model.as_ref(), &decoded, self.max_detections) {
      Ok(detections) => self.send(StageOutcome::Detected(detections)),
      Err(e @ ModelError::Load(_)) => self.fail(FailureKind::ModelLoadFailed, e),
      Err(e) => self.fail(FailureKind::InferenceFailed, e),
    }
  }
}

/// 持有视图状态的检测会话
///
/// 所有状态修改都发生在调用方线程；后台线程只通过通道发回阶段结果。
/// 每次 `select` 产生新的代号，旧代号的结果到达后直接丢弃。
pub struct DetectionSession {
  state: ViewState,
  model: Arc<LazyModel>,
  layout: Layout,
  options: SessionOptions,
  current: Arc<AtomicU64>,
  stage: Stage,
  last_progress: Instant,
  tx: Sender<StageMessage>,
  rx: Receiver<StageMessage>,
}

impl DetectionSession {
  pub fn new(model: Arc<LazyModel>, layout: Layout, options: SessionOptions) -> Self {
    let (tx, rx) = mpsc::channel();
    Self {
      state: ViewState::new(),
      model,
      layout,
      options,
      current: Arc::new(AtomicU64::new(0)),
      stage: Stage::Reading,
      last_progress: Instant::now(),
      tx,
      rx,
    }
  }

  pub fn state(&self) -> &ViewState {
    &self.state
  }

  pub fn layout(&self) -> Layout {
    self.layout
  }

  /// 开始一次新的选择，返回其代号
  pub fn select(&mut self, path: impl Into<PathBuf>) -> u64 {
    let path = path.into();
    let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
    let name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());
    self.state.apply(ViewEvent::SelectionStarted { generation, name });
    self.stage = Stage::Reading;
    self.last_progress = Instant::now();
    info!("选择图像 #{}: {}", generation, path.display());

    let worker = Worker {
      generation,
      path,
      model: self.model.clone(),
      current: self.current.clone(),
      tx: self.tx.clone(),
      max_detections: self.options.max_detections,
    };
    thread::spawn(move || worker.run());
    generation
  }

  /// 失败后回到可选择状态
  pub fn dismiss(&mut self) -> bool {
    self.state.apply(ViewEvent::Dismissed)
  }

  /// 非阻塞地应用所有已到达的阶段结果，并检查超时；返回被接受的结果数
  pub fn pump(&mut self) -> usize {
    let mut applied = 0;
    while let Ok(message) = self.rx.try_recv() {
      if self.handle(message) {
        applied += 1;
      }
    }
    self.check_timeout();
    applied
  }

  /// 阻塞直到当前代号离开加载状态（完成、失败或超时）
  pub fn wait_settled(&mut self) -> &ViewState {
    while self.state.is_loading() {
      let deadline = self.last_progress + self.options.stage_timeout;
      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        self.check_timeout();
        continue;
      }
      match self.rx.recv_timeout(remaining) {
        Ok(message) => {
          self.handle(message);
        }
        Err(RecvTimeoutError::Timeout) => self.check_timeout(),
        // 会话自身持有发送端，通道不会断开
        Err(RecvTimeoutError::Disconnected) => break,
      }
    }
    &self.state
  }

  /// 选择并等待结果
  pub fn run(&mut self, path: impl Into<PathBuf>) -> &ViewState {
    self.select(path);
    self.wait_settled()
  }

  fn check_timeout(&mut self) {
    if !self.state.is_loading() || self.last_progress.elapsed() < self.options.stage_timeout {
      return;
    }
    let kind = match self.stage {
      Stage::Reading => FailureKind::ReadFailed,
      Stage::Decoding => FailureKind::DecodeTimedOut,
      Stage::Inferring => FailureKind::InferenceTimedOut,
    };
    let timeout = self.options.stage_timeout;
    warn!("代号 {} 在 {:?} 阶段超时 ({:.2?})", self.state.generation(), self.stage, timeout);
    self.state.apply(ViewEvent::Failed {
      generation: self.state.generation(),
      failure: Failure::new(kind, format!("{:.2?} 内没有完成", timeout)),
    });
  }

  fn handle(&mut self, message: StageMessage) -> bool {
    let generation = message.generation;
    let (event, next_stage) = match message.outcome {
      StageOutcome::Read(image) => (ViewEvent::ImageRead { generation, image }, Stage::Decoding),
      StageOutcome::Decoded(natural_size) => (
        ViewEvent::ImageDecoded {
          generation,
          natural_size,
        },
        Stage::Inferring,
      ),
      StageOutcome::Detected(detections) => {
        let labels = detections.iter().map(|d| d.class_label.clone()).collect();
        // 渲染尺寸在归一化这一刻读取
        let natural = self.state.image().and_then(|image| image.natural_size);
        let rendered = natural.and_then(|size| self.layout.rendered_size(size));
        let detections = normalize_detections(&detections, natural, rendered);
        (
          ViewEvent::InferenceCompleted {
            generation,
            detections,
            labels,
            rendered_size: rendered,
          },
          self.stage,
        )
      }
      StageOutcome::Failed(failure) => {
        warn!("代号 {} 失败: {}", generation, failure);
        (ViewEvent::Failed { generation, failure }, self.stage)
      }
    };

    let applied = self.state.apply(event);
    if applied {
      self.stage = next_stage;
      self.last_progress = Instant::now();
      if !self.state.is_loading() && self.state.failure().is_none() {
        info!(
          "代号 {} 完成: {} 个目标",
          generation,
          self.state.detections().len()
        );
      }
    }
    applied
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn loading_session(stage: Stage, idle: Duration) -> DetectionSession {
    let model = Arc::new(LazyModel::new(|| Err(ModelError::Load("未使用".to_string()))));
    let options = SessionOptions {
      stage_timeout: Duration::from_millis(50),
      ..SessionOptions::default()
    };
    let mut session = DetectionSession::new(model, Layout::Natural, options);
    session.state.apply(ViewEvent::SelectionStarted {
      generation: 1,
      name: "a.png".to_string(),
    });
    session.stage = stage;
    session.last_progress = Instant::now() - idle;
    session
  }

  fn timed_out_kind(stage: Stage) -> Option<FailureKind> {
    let mut session = loading_session(stage, Duration::from_secs(1));
    session.check_timeout();
    session.state().failure().map(|f| f.kind)
  }

  #[test]
  fn each_stage_times_out_with_its_own_kind() {
    assert_eq!(timed_out_kind(Stage::Reading), Some(FailureKind::ReadFailed));
    assert_eq!(timed_out_kind(Stage::Decoding), Some(FailureKind::DecodeTimedOut));
    assert_eq!(timed_out_kind(Stage::Inferring), Some(FailureKind::InferenceTimedOut));
  }

  #[test]
  fn recent_progress_does_not_time_out() {
    let mut session = loading_session(Stage::Decoding, Duration::ZERO);
    session.check_timeout();
    assert!(session.state().is_loading());
  }

  #[test]
  fn decoded_message_moves_deadline_to_inference() {
    let mut session = loading_session(Stage::Decoding, Duration::from_secs(1));
    assert!(session.handle(StageMessage {
      generation: 1,
      outcome: StageOutcome::Read(DisplayImage::new("a.png", "data:image/png;base64,")),
    }));
    assert!(session.handle(StageMessage {
      generation: 1,
      outcome: StageOutcome::Decoded(Size::new(4.0, 3.0)),
    }));
    assert_eq!(session.stage, Stage::Inferring);
    session.check_timeout();
    assert!(session.state().is_loading());
  }
}
