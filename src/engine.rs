// 该文件是 Lanjing （揽景） 项目的一部分。
// src/engine.rs - 原生推理引擎边界
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

//! 原生推理引擎的窄接口。
//!
//! 神经网络计算完全交给原生库，这里只描述同步调用边界：
//! 加载/释放模型、暂存图像、按路径或暂存句柄推理。
//! 所有方法都是阻塞调用，调用方负责串行化。

use std::path::Path;

use thiserror::Error;

use crate::{
  frame::Bitmap,
  model::{DetectionResult, ModelDescriptor},
};

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("原生调用 {call} 返回错误码 {code}")]
  Status { call: &'static str, code: i32 },
  #[error("引擎无法接受该图像: {0}")]
  UnsupportedImage(String),
  #[error("检测结果索引越界: {index}")]
  IndexOutOfRange { index: usize },
  #[error("原生库加载失败: {0}")]
  Library(String),
}

impl EngineError {
  /// 原生库约定：负数返回码表示失败
  pub fn check(call: &'static str, code: i32) -> Result<i32, EngineError> {
    if code < 0 {
      Err(EngineError::Status { call, code })
    } else {
      Ok(code)
    }
  }
}

/// 两种分类器共用的引擎能力
pub trait NativeEngine: Send {
  /// 暂存图像的原生句柄
  type Handle: Send;

  fn load_model(&mut self, descriptor: &ModelDescriptor) -> Result<(), EngineError>;
  fn release_model(&mut self) -> Result<(), EngineError>;

  fn stage(&mut self, bitmap: &Bitmap) -> Result<Self::Handle, EngineError>;
  fn unstage(&mut self, handle: Self::Handle);
}

/// 目标检测引擎
///
/// 推理只返回检测数量，随后逐个索引取回结果。
pub trait DetectorEngine: NativeEngine {
  /// 空字符串表示取消标签过滤
  fn set_selected_label(&mut self, label: &str) -> Result<(), EngineError>;

  fn detect_path(&mut self, path: &Path) -> Result<usize, EngineError>;
  fn detect_staged(&mut self, handle: &Self::Handle) -> Result<usize, EngineError>;
  fn detection(&mut self, index: usize) -> Result<DetectionResult, EngineError>;
}

/// 场景分类引擎，输出每个类别一个分数
pub trait SceneEngine: NativeEngine {
  fn set_input_dim(&mut self, width: u32, height: u32) -> Result<(), EngineError>;

  fn scores_path(&mut self, path: &Path) -> Option<Vec<f32>>;
  fn scores_staged(&mut self, handle: &Self::Handle) -> Option<Vec<f32>>;
}
