// 该文件是 Lanjing （揽景） 项目的一部分。
// src/task.rs - 后台分类任务
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

//! 在后台线程执行按路径分类，调用方线程不阻塞。
//!
//! 同一个编排器同一时刻只允许一个任务在执行，新的提交直接以
//! [`TaskError::Busy`] 拒绝。每次提交的回调恰好调用一次；
//! 若调用方在完成前取消，结果被丢弃，回调不再调用。
//! 分类过程中的 panic 会被捕获，作为 [`ClassifierError::Panicked`] 送达。

use std::{
  any::Any,
  panic::{self, AssertUnwindSafe},
  path::{Path, PathBuf},
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::model::{Classifier, ClassifierError, ClassifierState, DetectionResult};

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("分类器正忙，已有任务在执行")]
  Busy,
  #[error("无法启动后台线程: {0}")]
  Spawn(#[from] std::io::Error),
  #[error("后台线程异常退出")]
  WorkerPanicked,
}

/// 一次分类的完整报告
#[derive(Debug)]
pub struct ClassificationReport {
  pub path: PathBuf,
  pub results: Result<Vec<DetectionResult>, ClassifierError>,
  pub elapsed: Duration,
  pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
  /// 传给 `init` 的图像尺寸
  pub init_size: (u32, u32),
  /// 每次分类后释放分类器，下次提交时重新创建
  pub release_after_use: bool,
  /// 分类完成后删除已消费的输入文件
  pub delete_input: bool,
}

impl Default for OrchestratorOptions {
  fn default() -> Self {
    Self {
      init_size: (0, 0),
      release_after_use: true,
      delete_input: true,
    }
  }
}

type Factory<C> = Box<dyn FnMut() -> Result<C, ClassifierError> + Send>;

struct Shared<C> {
  slot: Mutex<Option<C>>,
  factory: Mutex<Factory<C>>,
  in_flight: AtomicBool,
}

pub struct ClassificationOrchestrator<C> {
  shared: Arc<Shared<C>>,
  options: OrchestratorOptions,
}

/// 已提交任务的句柄
pub struct Submission {
  cancelled: Arc<AtomicBool>,
  worker: JoinHandle<bool>,
}

impl Submission {
  /// 丢弃尚未送达的结果；原生推理无法中断，会照常跑完
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_finished(&self) -> bool {
    self.worker.is_finished()
  }

  /// 等待后台线程结束，返回结果是否已送达
  pub fn wait(self) -> Result<bool, TaskError> {
    self.worker.join().map_err(|_| TaskError::WorkerPanicked)
  }
}

// 任务结束（含异常退出）时清除占用标记
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

impl<C> ClassificationOrchestrator<C>
where
  C: Classifier + 'static,
{
  pub fn new<F>(factory: F, options: OrchestratorOptions) -> Self
  where
    F: FnMut() -> Result<C, ClassifierError> + Send + 'static,
  {
    Self {
      shared: Arc::new(Shared {
        slot: Mutex::new(None),
        factory: Mutex::new(Box::new(factory)),
        in_flight: AtomicBool::new(false),
      }),
      options,
    }
  }

  pub fn is_busy(&self) -> bool {
    self.shared.in_flight.load(Ordering::SeqCst)
  }

  /// 提交一次按路径分类，`deliver` 在后台线程中调用
  pub fn submit<P, D>(&self, path: P, deliver: D) -> Result<Submission, TaskError>
  where
    P: Into<PathBuf>,
    D: FnOnce(ClassificationReport) + Send + 'static,
  {
    if self
      .shared
      .in_flight
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      warn!("已有分类任务在执行，拒绝新请求");
      return Err(TaskError::Busy);
    }

    let path = path.into();
    let shared = Arc::clone(&self.shared);
    let options = self.options.clone();
    let cancelled = Arc::new(AtomicBool::new(false));
    let worker_cancelled = Arc::clone(&cancelled);

    let spawned = thread::Builder::new()
      .name("classify-worker".to_string())
      .spawn(move || {
        let guard = InFlightGuard(&shared.in_flight);
        info!("开始分类: {}", path.display());
        let now = Instant::now();
        let results = panic::catch_unwind(AssertUnwindSafe(|| {
          run_classification(&shared, &path, &options)
        }))
        .unwrap_or_else(|payload| {
          let message = panic_message(payload.as_ref());
          error!("分类过程中发生 panic: {}", message);
          discard_classifier(&shared);
          Err(ClassifierError::Panicked(message))
        });
        let elapsed = now.elapsed();
        info!("分类完成，耗时: {:.2?}", elapsed);

        if options.delete_input {
          remove_consumed_input(&path);
        }
        drop(guard);

        if worker_cancelled.load(Ordering::SeqCst) {
          warn!("任务已取消，丢弃结果: {}", path.display());
          return false;
        }

        deliver(ClassificationReport {
          path,
          results,
          elapsed,
          finished_at: Utc::now(),
        });
        true
      });

    match spawned {
      Ok(worker) => Ok(Submission { cancelled, worker }),
      Err(e) => {
        self.shared.in_flight.store(false, Ordering::SeqCst);
        Err(TaskError::Spawn(e))
      }
    }
  }

  /// 释放编排器持有的分类器
  pub fn release(&self) -> Result<(), TaskError> {
    if self
      .shared
      .in_flight
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return Err(TaskError::Busy);
    }
    let _guard = InFlightGuard(&self.shared.in_flight);

    let mut slot = self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mut classifier) = slot.take() {
      release_classifier(&mut classifier);
    }
    Ok(())
  }
}

fn run_classification<C: Classifier>(
  shared: &Shared<C>,
  path: &Path,
  options: &OrchestratorOptions,
) -> Result<Vec<DetectionResult>, ClassifierError> {
  let mut slot = shared.slot.lock().unwrap_or_else(PoisonError::into_inner);

  let classifier = match slot.take() {
    Some(classifier) if classifier.state() != ClassifierState::Released => slot.insert(classifier),
    _ => {
      debug!("创建新的分类器");
      let mut factory = shared.factory.lock().unwrap_or_else(PoisonError::into_inner);
      slot.insert((*factory)()?)
    }
  };

  let initialized = if classifier.state() == ClassifierState::Ready {
    Ok(())
  } else {
    let (width, height) = options.init_size;
    classifier.init(width, height)
  };
  let results = initialized.and_then(|_| classifier.classify_by_path(path));

  if options.release_after_use {
    if let Some(mut classifier) = slot.take() {
      release_classifier(&mut classifier);
    }
  }

  results
}

fn release_classifier<C: Classifier>(classifier: &mut C) {
  if classifier.state() == ClassifierState::Released {
    return;
  }
  if let Err(e) = classifier.de_init() {
    warn!("释放分类器失败: {}", e);
  }
}

// panic 之后分类器状态不可信，丢弃后由工厂重新创建
fn discard_classifier<C: Classifier>(shared: &Shared<C>) {
  let stale = shared.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
  if panic::catch_unwind(AssertUnwindSafe(|| drop(stale))).is_err() {
    warn!("丢弃分类器时再次发生 panic");
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "未知 panic".to_string()
  }
}

// 尽力删除，失败只记录日志
fn remove_consumed_input(path: &Path) {
  match std::fs::remove_file(path) {
    Ok(()) => debug!("已删除输入文件: {}", path.display()),
    Err(e) => warn!("删除输入文件失败 {}: {}", path.display(), e),
  }
}
