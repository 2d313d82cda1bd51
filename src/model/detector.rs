// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model/detector.rs - 目标检测器
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
  engine::{DetectorEngine, EngineError},
  frame::Bitmap,
  model::{
    Classifier, ClassifierError, ClassifierState, DetectionResult, LabelTable, Lifecycle,
    ModelDescriptor, NativeBuffer,
  },
  runtime,
};

/// 单次推理最多取回的检测结果数，超出部分丢弃
pub const MAX_DETECTIONS: usize = 512;

/// 在图像中识别并定位目标
pub struct ObjectDetector<E: DetectorEngine> {
  descriptor: ModelDescriptor,
  labels: LabelTable,
  engine: E,
  buffer: NativeBuffer<E::Handle>,
  lifecycle: Lifecycle,
  selected_label: Option<String>,
  image_size: (u32, u32),
}

impl<E: DetectorEngine> ObjectDetector<E> {
  /// 构造时立即检查模型文件，缺失则失败
  pub fn new(descriptor: ModelDescriptor, engine: E) -> Result<Self, ClassifierError> {
    runtime::ensure_initialized()?;
    descriptor.validate()?;
    info!("创建目标检测器: {}", descriptor.model_path.display());

    Ok(Self {
      descriptor,
      labels: LabelTable::default(),
      engine,
      buffer: NativeBuffer::default(),
      lifecycle: Lifecycle::default(),
      selected_label: None,
      image_size: (0, 0),
    })
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

  pub fn selected_label(&self) -> Option<&str> {
    self.selected_label.as_deref()
  }

  pub fn has_live_buffer(&self) -> bool {
    self.buffer.is_live()
  }

  /// 只检测指定类别
  pub fn set_selected_label(&mut self, label: &str) -> Result<(), ClassifierError> {
    self.lifecycle.require_ready("set_selected_label")?;
    if !self.labels.contains(label) {
      warn!("标签 {} 不在标签表中", label);
    }
    self.engine.set_selected_label(label)?;
    self.selected_label = Some(label.to_string());
    debug!("设置标签过滤: {}", label);
    Ok(())
  }

  pub fn clear_selected_label(&mut self) -> Result<(), ClassifierError> {
    self.lifecycle.require_ready("clear_selected_label")?;
    self.engine.set_selected_label("")?;
    self.selected_label = None;
    debug!("清除标签过滤");
    Ok(())
  }

  // 逐个取回检测结果，单个索引失败时跳过该项
  fn collect_detections(&mut self, count: Result<usize, EngineError>) -> Vec<DetectionResult> {
    let count = match count {
      Ok(count) => count,
      Err(e) => {
        warn!("检测失败，返回空结果: {}", e);
        return Vec::new();
      }
    };

    if count > MAX_DETECTIONS {
      warn!("引擎报告 {} 个检测结果, 只取前 {} 个", count, MAX_DETECTIONS);
    }

    let mut results = Vec::new();
    for index in 0..count.min(MAX_DETECTIONS) {
      match self.engine.detection(index) {
        Ok(det) => results.push(det),
        Err(e) => debug!("跳过第 {} 个检测结果: {}", index, e),
      }
    }
    debug!("检测到 {} 个目标, 有效 {} 个", count, results.len());
    results
  }
}

impl<E: DetectorEngine> Classifier for ObjectDetector<E> {
  fn init(&mut self, width: u32, height: u32) -> Result<(), ClassifierError> {
    self.lifecycle.begin_init()?;

    self.labels = LabelTable::load(&self.descriptor.labels_path)?;
    self.image_size = (width, height);
    self.lifecycle.mark_loaded();

    info!("加载检测模型: {}", self.descriptor.weights_path.display());
    if let Err(e) = self.engine.load_model(&self.descriptor) {
      error!("检测模型加载失败: {}", e);
      return Err(e.into());
    }
    self.lifecycle.mark_ready();
    info!("检测模型加载完成");
    Ok(())
  }

  fn classify(&mut self, bitmap: Option<&Bitmap>) -> Result<Vec<DetectionResult>, ClassifierError> {
    self.lifecycle.require_ready("classify")?;

    let Some(bitmap) = bitmap else {
      error!("classify: 输入图像无效");
      self.buffer.release(&mut self.engine);
      return Ok(Vec::new());
    };

    let count = self
      .buffer
      .with_staged(&mut self.engine, bitmap, |engine, handle| {
        engine.detect_staged(handle)
      })?;
    Ok(self.collect_detections(count))
  }

  fn classify_by_path(&mut self, path: &Path) -> Result<Vec<DetectionResult>, ClassifierError> {
    self.lifecycle.require_ready("classify_by_path")?;

    if path.as_os_str().is_empty() || !path.exists() {
      error!("classify_by_path: 输入路径无效: {}", path.display());
      return Ok(Vec::new());
    }

    let count = self.engine.detect_path(path);
    Ok(self.collect_detections(count))
  }

  fn de_init(&mut self) -> Result<(), ClassifierError> {
    self.lifecycle.require_alive("de_init")?;

    self.buffer.release(&mut self.engine);
    let was_ready = self.lifecycle.state() == ClassifierState::Ready;
    self.lifecycle.mark_released();
    if was_ready {
      self.engine.release_model()?;
      info!("检测模型已释放");
    }
    Ok(())
  }

  fn state(&self) -> ClassifierState {
    self.lifecycle.state()
  }
}

impl<E: DetectorEngine> Drop for ObjectDetector<E> {
  fn drop(&mut self) {
    self.buffer.release(&mut self.engine);
    if self.lifecycle.state() == ClassifierState::Ready {
      warn!("检测器析构时仍处于 Ready，释放原生模型");
      if let Err(e) = self.engine.release_model() {
        error!("释放检测模型失败: {}", e);
      }
      self.lifecycle.mark_released();
    }
  }
}
