// 该文件是 Lanjing （揽景） 项目的一部分。
// src/runtime.rs - 进程级原生运行时初始化
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

//! 原生库在进程内只加载一次。
//!
//! 规则：
//! - 构造任何分类器之前必须先调用 [`initialize`]，否则构造失败；
//! - 初始化串行执行，成功后再次调用直接返回已记录的 [`RuntimeInfo`]；
//! - 加载失败不会被记录，可以重试；
//! - 运行时不提供卸载，存活到进程退出。各分类器自己的模型由
//!   `de_init` 或析构释放。

use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::{engine::EngineError, model::ClassifierError};

#[derive(Debug, Clone)]
pub struct RuntimeInfo {
  pub libraries: Vec<String>,
  pub initialized_at: DateTime<Utc>,
}

static RUNTIME: OnceLock<RuntimeInfo> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

pub fn initialize<F>(libraries: &[&str], loader: F) -> Result<&'static RuntimeInfo, EngineError>
where
  F: FnOnce(&[&str]) -> Result<(), EngineError>,
{
  if let Some(info) = RUNTIME.get() {
    debug!("原生运行时已初始化，跳过");
    return Ok(info);
  }

  let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
  if let Some(info) = RUNTIME.get() {
    return Ok(info);
  }

  info!("加载原生库: {:?}", libraries);
  if let Err(e) = loader(libraries) {
    error!("原生库加载失败: {}", e);
    return Err(e);
  }

  let info = RUNTIME.get_or_init(|| RuntimeInfo {
    libraries: libraries.iter().map(|s| s.to_string()).collect(),
    initialized_at: Utc::now(),
  });
  info!("原生运行时初始化完成");
  Ok(info)
}

pub fn is_initialized() -> bool {
  RUNTIME.get().is_some()
}

pub fn info() -> Option<&'static RuntimeInfo> {
  RUNTIME.get()
}

pub(crate) fn ensure_initialized() -> Result<(), ClassifierError> {
  if is_initialized() {
    Ok(())
  } else {
    Err(ClassifierError::RuntimeNotInitialized)
  }
}
