// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model/descriptor.rs - 模型文件描述
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

use std::{fmt, path::PathBuf};

use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::ClassifierError};

const SCENE_MODEL_PATH: &str = "/sdcard/phone_data/vision_scene/mit/deploy_places205_mem.protxt";
const SCENE_WEIGHTS_PATH: &str =
  "/sdcard/phone_data/vision_scene/mit/googlelet_places205_train_iter_2400000.caffemodel";
const SCENE_LABELS_PATH: &str = "/sdcard/phone_data/vision_scene/mit/mit_category_table";

const DETECT_MODEL_PATH: &str = "/sdcard/phone_data/fastrcnn/deploy.prototxt";
const DETECT_WEIGHTS_PATH: &str =
  "/sdcard/phone_data/fastrcnn/caffenet_fast_rcnn_iter_40000.caffemodel";
const DETECT_MEAN_PATH: &str = "/sdcard/phone_data/fastrcnn/imagenet_mean.binaryproto";
const DETECT_LABELS_PATH: &str = "/sdcard/phone_data/fastrcnn/fastrcnn_synset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFileKind {
  Model,
  Weights,
  Mean,
  Labels,
}

impl fmt::Display for ModelFileKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ModelFileKind::Model => "模型定义",
      ModelFileKind::Weights => "训练权重",
      ModelFileKind::Mean => "均值文件",
      ModelFileKind::Labels => "标签列表",
    };
    f.write_str(name)
  }
}

/// 分类器使用的模型文件与输入尺寸，构造后不可修改
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
  pub model_path: PathBuf,
  pub weights_path: PathBuf,
  pub mean_path: Option<PathBuf>,
  pub labels_path: PathBuf,
  /// 场景分类的正方形输入边长
  pub input_dim: Option<u32>,
}

impl ModelDescriptor {
  pub fn new(
    model_path: impl Into<PathBuf>,
    weights_path: impl Into<PathBuf>,
    labels_path: impl Into<PathBuf>,
  ) -> Self {
    Self {
      model_path: model_path.into(),
      weights_path: weights_path.into(),
      mean_path: None,
      labels_path: labels_path.into(),
      input_dim: None,
    }
  }

  pub fn with_mean(mut self, mean_path: impl Into<PathBuf>) -> Self {
    self.mean_path = Some(mean_path.into());
    self
  }

  pub fn with_input_dim(mut self, dim: u32) -> Self {
    self.input_dim = Some(dim);
    self
  }

  /// 设备上场景分类模型的默认位置
  pub fn default_scene() -> Self {
    Self::new(SCENE_MODEL_PATH, SCENE_WEIGHTS_PATH, SCENE_LABELS_PATH)
  }

  /// 设备上目标检测模型的默认位置
  pub fn default_detector() -> Self {
    Self::new(DETECT_MODEL_PATH, DETECT_WEIGHTS_PATH, DETECT_LABELS_PATH)
      .with_mean(DETECT_MEAN_PATH)
  }

  /// 检查所有必需文件是否存在；给出均值文件时也一并检查
  pub fn validate(&self) -> Result<(), ClassifierError> {
    let required = [
      (ModelFileKind::Model, Some(&self.model_path)),
      (ModelFileKind::Weights, Some(&self.weights_path)),
      (ModelFileKind::Labels, Some(&self.labels_path)),
      (ModelFileKind::Mean, self.mean_path.as_ref()),
    ];

    for (kind, path) in required {
      let Some(path) = path else { continue };
      if path.as_os_str().is_empty() || !path.exists() {
        error!("找不到{}: {}", kind, path.display());
        return Err(ClassifierError::ModelNotFound {
          kind,
          path: path.clone(),
        });
      }
      debug!("{}: {}", kind, path.display());
    }
    Ok(())
  }
}

impl FromUrlWithScheme for ModelDescriptor {
  const SCHEME: &'static str = "model";
}

/// `model:///abs/deploy.prototxt?weights=...&labels=...&mean=...&dim=224`
impl FromUrl for ModelDescriptor {
  type Error = ClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ClassifierError::InvalidUrl(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let model_path = urlencoding::decode(url.path())
      .map_err(|e| ClassifierError::InvalidUrl(e.to_string()))?
      .into_owned();

    let mut weights = None;
    let mut labels = None;
    let mut mean = None;
    let mut dim = None;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "weights" => weights = Some(v.into_owned()),
        "labels" => labels = Some(v.into_owned()),
        "mean" => mean = Some(v.into_owned()),
        "dim" => {
          let parsed = v
            .parse::<u32>()
            .map_err(|e| ClassifierError::InvalidUrl(format!("dim={}: {}", v, e)))?;
          dim = Some(parsed);
        }
        other => debug!("忽略未知参数: {}", other),
      }
    }

    let weights =
      weights.ok_or_else(|| ClassifierError::InvalidUrl("缺少 weights 参数".to_string()))?;
    let labels =
      labels.ok_or_else(|| ClassifierError::InvalidUrl("缺少 labels 参数".to_string()))?;

    let mut descriptor = ModelDescriptor::new(model_path, weights, labels);
    descriptor.mean_path = mean.map(PathBuf::from);
    descriptor.input_dim = dim;
    Ok(descriptor)
  }
}
