// 该文件是 Kanjian （看见） 项目的一部分。
// src/model.rs - 检测模型
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

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, geometry::BoundingBox, input::DecodedImage};

/// 每次推理返回的最大检测数
pub const DEFAULT_MAX_DETECTIONS: usize = 6;

/// 模型的一条输出，bbox 位于原图像素坐标系
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  #[serde(rename = "class")]
  pub class_label: String,
  pub score: f32,
  pub bbox: BoundingBox,
}

impl Detection {
  pub fn new(class_label: impl Into<String>, score: f32, bbox: BoundingBox) -> Self {
    Self {
      class_label: class_label.into(),
      score,
      bbox,
    }
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {0}")]
  Load(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 外部检测器，核心只通过该接口调用
pub trait Model: Send + Sync {
  fn detect(
    &self,
    image: &DecodedImage,
    max_detections: usize,
  ) -> Result<Vec<Detection>, ModelError>;
}

impl<M: Model + ?Sized> Model for Arc<M> {
  fn detect(
    &self,
    image: &DecodedImage,
    max_detections: usize,
  ) -> Result<Vec<Detection>, ModelError> {
    (**self).detect(image, max_detections)
  }
}

impl<M: Model + ?Sized> Model for Box<M> {
  fn detect(
    &self,
    image: &DecodedImage,
    max_detections: usize,
  ) -> Result<Vec<Detection>, ModelError> {
    (**self).detect(image, max_detections)
  }
}

/// 调用模型，按置信度降序排列并截断到 `max_detections`
pub fn run_inference<M: Model + ?Sized>(
  model: &M,
  image: &DecodedImage,
  max_detections: usize,
) -> Result<Vec<Detection>, ModelError> {
  let now = std::time::Instant::now();
  let mut detections = model.detect(image, max_detections)?;
  detections.sort_by(|a, b| b.score.total_cmp(&a.score));
  detections.truncate(max_detections);
  debug!(
    "推理完成 {}: {} 个目标, 耗时 {:.2?}",
    image.name,
    detections.len(),
    now.elapsed()
  );
  Ok(detections)
}

mod labels;
pub use self::labels::{COCO_LABELS, coco_label};

mod replay;
pub use self::replay::ReplayModel;

#[cfg(feature = "command_model")]
mod command;
#[cfg(feature = "command_model")]
pub use self::command::CommandModel;

pub enum ModelWrapper {
  Replay(ReplayModel),
  #[cfg(feature = "command_model")]
  Command(CommandModel),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    use crate::FromUrlWithScheme;

    if url.scheme() == ReplayModel::SCHEME {
      return Ok(ModelWrapper::Replay(ReplayModel::from_url(url)?));
    }
    #[cfg(feature = "command_model")]
    {
      if url.scheme() == CommandModel::SCHEME {
        return Ok(ModelWrapper::Command(CommandModel::from_url(url)?));
      }
    }
    Err(ModelError::SchemeMismatch)
  }
}

impl Model for ModelWrapper {
  fn detect(
    &self,
    image: &DecodedImage,
    max_detections: usize,
  ) -> Result<Vec<Detection>, ModelError> {
    match self {
      ModelWrapper::Replay(model) => model.detect(image, max_detections),
      #[cfg(feature = "command_model")]
      ModelWrapper::Command(model) => model.detect(image, max_detections),
    }
  }
}

type ModelLoader = dyn Fn() -> Result<Arc<dyn Model>, ModelError> + Send + Sync;

/// 首次使用时加载模型；加载成功后缓存，失败则下次重试
pub struct LazyModel {
  loader: Box<ModelLoader>,
  cache: Mutex<Option<Arc<dyn Model>>>,
}

impl LazyModel {
  pub fn new<F>(loader: F) -> Self
  where
    F: Fn() -> Result<Arc<dyn Model>, ModelError> + Send + Sync + 'static,
  {
    Self {
      loader: Box::new(loader),
      cache: Mutex::new(None),
    }
  }

  pub fn from_url(url: Url) -> Self {
    Self::new(move || {
      let model = ModelWrapper::from_url(&url)?;
      Ok(Arc::new(model) as Arc<dyn Model>)
    })
  }

  pub fn ready(model: Arc<dyn Model>) -> Self {
    Self {
      loader: Box::new(|| Err(ModelError::Load("模型已预先加载".to_string()))),
      cache: Mutex::new(Some(model)),
    }
  }

  pub fn get(&self) -> Result<Arc<dyn Model>, ModelError> {
    let mut cache = self
      .cache
      .lock()
      .map_err(|_| ModelError::Load("模型缓存锁已失效".to_string()))?;
    if let Some(model) = cache.as_ref() {
      return Ok(model.clone());
    }

    info!("加载检测模型...");
    match (self.loader)() {
      Ok(model) => {
        info!("模型加载完成");
        *cache = Some(model.clone());
        Ok(model)
      }
      Err(e) => {
        warn!("模型加载失败: {}", e);
        Err(match e {
          ModelError::Load(_) => e,
          other => ModelError::Load(other.to_string()),
        })
      }
    }
  }
}
