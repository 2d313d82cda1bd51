// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model.rs - 分类器模型
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

use thiserror::Error;

use crate::{
  engine::{DetectorEngine, EngineError, SceneEngine},
  frame::Bitmap,
};

mod buffer;
mod descriptor;
mod detector;
mod labels;
mod lifecycle;
mod ranking;
mod scene;

pub use self::buffer::NativeBuffer;
pub use self::descriptor::{ModelDescriptor, ModelFileKind};
pub use self::detector::{MAX_DETECTIONS, ObjectDetector};
pub use self::labels::LabelTable;
pub use self::lifecycle::{ClassifierState, Lifecycle};
pub use self::ranking::{DEFAULT_TOP_K, rank_predictions};
pub use self::scene::{SCENE_MODEL_DIM, SceneClassifier};

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("找不到模型文件 ({kind}): {}", .path.display())]
  ModelNotFound { kind: ModelFileKind, path: PathBuf },
  #[error("图像暂存失败: {0}")]
  ImageStaging(String),
  #[error("当前状态 {state} 不允许调用 {operation}")]
  LifecycleViolation {
    operation: &'static str,
    state: ClassifierState,
  },
  #[error("标签文件读取失败: {0}")]
  LabelLoad(#[from] std::io::Error),
  #[error("推理引擎错误: {0}")]
  Engine(#[from] EngineError),
  #[error("原生运行时尚未初始化")]
  RuntimeNotInitialized,
  #[error("模型 URL 无效: {0}")]
  InvalidUrl(String),
  #[error("分类过程异常终止: {0}")]
  Panicked(String),
}

/// 像素坐标下的边界框 (left, top, right, bottom)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
}

impl BoundingBox {
  /// 场景分类结果使用的退化框
  pub const ZERO: BoundingBox = BoundingBox {
    left: 0,
    top: 0,
    right: 0,
    bottom: 0,
  };

  pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  pub fn is_degenerate(&self) -> bool {
    self.right <= self.left || self.bottom <= self.top
  }
}

/// 单条检测或分类结果。
///
/// 分数彼此独立，不保证归一化，只用于排序。
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
  pub label: String,
  pub confidence: f32,
  pub bounding_box: BoundingBox,
}

impl DetectionResult {
  pub fn new(label: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Self {
    Self {
      label: label.into(),
      confidence,
      bounding_box,
    }
  }

  pub fn unboxed(label: impl Into<String>, confidence: f32) -> Self {
    Self::new(label, confidence, BoundingBox::ZERO)
  }
}

/// 两种分类器共有的能力
pub trait Classifier: Send {
  /// 加载标签与原生模型，进入 `Ready`
  fn init(&mut self, width: u32, height: u32) -> Result<(), ClassifierError>;

  /// `None` 表示没有可用图像，直接返回空结果
  fn classify(&mut self, bitmap: Option<&Bitmap>) -> Result<Vec<DetectionResult>, ClassifierError>;

  /// 空路径或不存在的路径返回空结果
  fn classify_by_path(&mut self, path: &Path) -> Result<Vec<DetectionResult>, ClassifierError>;

  /// 释放原生资源，进入终态 `Released`
  fn de_init(&mut self) -> Result<(), ClassifierError>;

  fn state(&self) -> ClassifierState;
}

pub enum VisionClassifier<D: DetectorEngine, S: SceneEngine> {
  Detector(ObjectDetector<D>),
  Scene(SceneClassifier<S>),
}

impl<D: DetectorEngine, S: SceneEngine> Classifier for VisionClassifier<D, S> {
  fn init(&mut self, width: u32, height: u32) -> Result<(), ClassifierError> {
    match self {
      VisionClassifier::Detector(c) => c.init(width, height),
      VisionClassifier::Scene(c) => c.init(width, height),
    }
  }

  fn classify(&mut self, bitmap: Option<&Bitmap>) -> Result<Vec<DetectionResult>, ClassifierError> {
    match self {
      VisionClassifier::Detector(c) => c.classify(bitmap),
      VisionClassifier::Scene(c) => c.classify(bitmap),
    }
  }

  fn classify_by_path(&mut self, path: &Path) -> Result<Vec<DetectionResult>, ClassifierError> {
    match self {
      VisionClassifier::Detector(c) => c.classify_by_path(path),
      VisionClassifier::Scene(c) => c.classify_by_path(path),
    }
  }

  fn de_init(&mut self) -> Result<(), ClassifierError> {
    match self {
      VisionClassifier::Detector(c) => c.de_init(),
      VisionClassifier::Scene(c) => c.de_init(),
    }
  }

  fn state(&self) -> ClassifierState {
    match self {
      VisionClassifier::Detector(c) => c.state(),
      VisionClassifier::Scene(c) => c.state(),
    }
  }
}

impl<D: DetectorEngine, S: SceneEngine> From<ObjectDetector<D>> for VisionClassifier<D, S> {
  fn from(detector: ObjectDetector<D>) -> Self {
    VisionClassifier::Detector(detector)
  }
}

impl<D: DetectorEngine, S: SceneEngine> From<SceneClassifier<S>> for VisionClassifier<D, S> {
  fn from(scene: SceneClassifier<S>) -> Self {
    VisionClassifier::Scene(scene)
  }
}

/// 使用默认模型布局创建目标检测器
pub fn create_object_detector<E: DetectorEngine>(
  engine: E,
) -> Result<ObjectDetector<E>, ClassifierError> {
  ObjectDetector::new(ModelDescriptor::default_detector(), engine)
}

/// 使用默认模型布局创建场景分类器
pub fn create_scene_classifier<E: SceneEngine>(
  engine: E,
) -> Result<SceneClassifier<E>, ClassifierError> {
  SceneClassifier::new(ModelDescriptor::default_scene(), engine)
}
