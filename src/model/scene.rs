// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model/scene.rs - 场景分类器
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

use tracing::{debug, error, info, warn};

use crate::{
  engine::SceneEngine,
  frame::Bitmap,
  model::{
    Classifier, ClassifierError, ClassifierState, DEFAULT_TOP_K, DetectionResult, LabelTable,
    Lifecycle, ModelDescriptor, NativeBuffer, rank_predictions,
  },
  runtime,
};

pub const SCENE_MODEL_DIM: u32 = 224;

/// 识别整张图像的场景类别，结果不带边界框
pub struct SceneClassifier<E: SceneEngine> {
  descriptor: ModelDescriptor,
  labels: LabelTable,
  engine: E,
  buffer: NativeBuffer<E::Handle>,
  lifecycle: Lifecycle,
  top_k: usize,
  image_size: (u32, u32),
}

impl<E: SceneEngine> SceneClassifier<E> {
  pub fn new(descriptor: ModelDescriptor, engine: E) -> Result<Self, ClassifierError> {
    runtime::ensure_initialized()?;
    descriptor.validate()?;
    info!("创建场景分类器: {}", descriptor.model_path.display());

    Ok(Self {
      descriptor,
      labels: LabelTable::default(),
      engine,
      buffer: NativeBuffer::default(),
      lifecycle: Lifecycle::default(),
      top_k: DEFAULT_TOP_K,
      image_size: (0, 0),
    })
  }

  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn top_k(&self) -> usize {
    self.top_k
  }

  pub fn input_dim(&self) -> u32 {
    self.descriptor.input_dim.unwrap_or(SCENE_MODEL_DIM)
  }

  pub fn descriptor(&self) -> &ModelDescriptor {
    &self.descriptor
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn image_size(&self) -> (u32, u32) {
    self.image_size
  }

  pub fn has_live_buffer(&self) -> bool {
    self.buffer.is_live()
  }

  fn to_results(&self, scores: Option<Vec<f32>>) -> Vec<DetectionResult> {
    if scores.is_none() {
      warn!("引擎未返回分数向量");
    }
    rank_predictions(&self.labels, scores.as_deref(), self.top_k)
      .into_iter()
      .map(|(label, score)| DetectionResult::unboxed(label, score))
      .collect()
  }
}

impl<E: SceneEngine> Classifier for SceneClassifier<E> {
  fn init(&mut self, width: u32, height: u32) -> Result<(), ClassifierError> {
    self.lifecycle.begin_init()?;

    self.labels = LabelTable::load(&self.descriptor.labels_path)?;
    self.image_size = (width, height);
    self.lifecycle.mark_loaded();

    info!("加载场景模型: {}", self.descriptor.weights_path.display());
    let dim = self.input_dim();
    let loaded = self
      .engine
      .load_model(&self.descriptor)
      .and_then(|_| self.engine.set_input_dim(dim, dim));
    if let Err(e) = loaded {
      error!("场景模型加载失败: {}", e);
      return Err(e.into());
    }
    self.lifecycle.mark_ready();
    info!("场景模型加载完成, 输入尺寸 {}x{}", dim, dim);
    Ok(())
  }

  fn classify(&mut self, bitmap: Option<&Bitmap>) -> Result<Vec<DetectionResult>, ClassifierError> {
    self.lifecycle.require_ready("classify")?;

    let Some(bitmap) = bitmap else {
      error!("classify: 输入图像无效");
      self.buffer.release(&mut self.engine);
      return Ok(Vec::new());
    };

    let scores = self
      .buffer
      .with_staged(&mut self.engine, bitmap, |engine, handle| {
        engine.scores_staged(handle)
      })?;
    let results = self.to_results(scores);
    debug!("场景分类完成, 返回 {} 项", results.len());
    Ok(results)
  }

  fn classify_by_path(&mut self, path: &Path) -> Result<Vec<DetectionResult>, ClassifierError> {
    self.lifecycle.require_ready("classify_by_path")?;

    if path.as_os_str().is_empty() || !path.exists() {
      error!("classify_by_path: 输入路径无效: {}", path.display());
      return Ok(Vec::new());
    }

    let scores = self.engine.scores_path(path);
    Ok(self.to_results(scores))
  }

  fn de_init(&mut self) -> Result<(), ClassifierError> {
    self.lifecycle.require_alive("de_init")?;

    self.buffer.release(&mut self.engine);
    let was_ready = self.lifecycle.state() == ClassifierState::Ready;
    self.lifecycle.mark_released();
    if was_ready {
      self.engine.release_model()?;
      info!("场景模型已释放");
    }
    Ok(())
  }

  fn state(&self) -> ClassifierState {
    self.lifecycle.state()
  }
}

impl<E: SceneEngine> Drop for SceneClassifier<E> {
  fn drop(&mut self) {
    self.buffer.release(&mut self.engine);
    if self.lifecycle.state() == ClassifierState::Ready {
      warn!("场景分类器析构时仍处于 Ready，释放原生模型");
      if let Err(e) = self.engine.release_model() {
        error!("释放场景模型失败: {}", e);
      }
      self.lifecycle.mark_released();
    }
  }
}
