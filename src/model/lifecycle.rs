// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model/lifecycle.rs - 分类器生命周期状态机
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

//! ```text
//! Uninitialized --init--> Loaded --原生模型加载--> Ready --de_init--> Released
//! ```
//!
//! - `init` 只能从 `Uninitialized` 或 `Loaded`（上次原生加载失败）发起，
//!   `Ready` 状态下重复 `init` 视为违规，不会重新加载模型；
//! - 推理类操作要求 `Ready`，不改变状态；
//! - `Released` 是终态，之后的任何调用都是违规。

use std::fmt;

use tracing::{debug, error};

use crate::model::ClassifierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
  Uninitialized,
  Loaded,
  Ready,
  Released,
}

impl fmt::Display for ClassifierState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ClassifierState::Uninitialized => "Uninitialized",
      ClassifierState::Loaded => "Loaded",
      ClassifierState::Ready => "Ready",
      ClassifierState::Released => "Released",
    };
    f.write_str(name)
  }
}

#[derive(Debug)]
pub struct Lifecycle {
  state: ClassifierState,
}

impl Default for Lifecycle {
  fn default() -> Self {
    Self {
      state: ClassifierState::Uninitialized,
    }
  }
}

impl Lifecycle {
  pub fn state(&self) -> ClassifierState {
    self.state
  }

  pub fn begin_init(&self) -> Result<(), ClassifierError> {
    match self.state {
      ClassifierState::Uninitialized | ClassifierState::Loaded => Ok(()),
      state => Err(violation("init", state)),
    }
  }

  pub fn require_ready(&self, operation: &'static str) -> Result<(), ClassifierError> {
    match self.state {
      ClassifierState::Ready => Ok(()),
      state => Err(violation(operation, state)),
    }
  }

  pub fn require_alive(&self, operation: &'static str) -> Result<(), ClassifierError> {
    match self.state {
      ClassifierState::Released => Err(violation(operation, ClassifierState::Released)),
      _ => Ok(()),
    }
  }

  pub fn mark_loaded(&mut self) {
    self.transition(ClassifierState::Loaded);
  }

  pub fn mark_ready(&mut self) {
    self.transition(ClassifierState::Ready);
  }

  pub fn mark_released(&mut self) {
    self.transition(ClassifierState::Released);
  }

  fn transition(&mut self, next: ClassifierState) {
    debug!("生命周期: {} -> {}", self.state, next);
    self.state = next;
  }
}

fn violation(operation: &'static str, state: ClassifierState) -> ClassifierError {
  error!("状态 {} 下不允许调用 {}", state, operation);
  ClassifierError::LifecycleViolation { operation, state }
}
