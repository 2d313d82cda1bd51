// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model/buffer.rs - 原生图像缓冲区
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

use tracing::{debug, error, warn};

use crate::{engine::NativeEngine, frame::Bitmap, model::ClassifierError};

/// 每个分类器独占的暂存槽，同一时刻最多持有一个原生句柄。
///
/// 获取新句柄前会先释放旧句柄；释放是幂等的。
#[derive(Debug)]
pub struct NativeBuffer<H> {
  handle: Option<H>,
}

impl<H> Default for NativeBuffer<H> {
  fn default() -> Self {
    Self { handle: None }
  }
}

impl<H> NativeBuffer<H> {
  pub fn is_live(&self) -> bool {
    self.handle.is_some()
  }

  pub fn acquire<E>(&mut self, engine: &mut E, bitmap: &Bitmap) -> Result<&H, ClassifierError>
  where
    E: NativeEngine<Handle = H>,
  {
    if self.handle.is_some() {
      warn!("暂存新图像前释放残留的原生缓冲区");
      self.release(engine);
    }

    if bitmap.is_empty() {
      error!("无法暂存零尺寸图像: {}x{}", bitmap.width(), bitmap.height());
      return Err(ClassifierError::ImageStaging(format!(
        "零尺寸图像 {}x{}",
        bitmap.width(),
        bitmap.height()
      )));
    }

    let handle = engine.stage(bitmap).map_err(|e| {
      error!("引擎拒绝暂存图像: {}", e);
      ClassifierError::ImageStaging(e.to_string())
    })?;
    debug!("图像已暂存: {}x{}", bitmap.width(), bitmap.height());
    Ok(self.handle.insert(handle))
  }

  pub fn release<E>(&mut self, engine: &mut E)
  where
    E: NativeEngine<Handle = H>,
  {
    if let Some(handle) = self.handle.take() {
      engine.unstage(handle);
      debug!("原生缓冲区已释放");
    }
  }

  /// 暂存图像并执行 `f`，返回前释放缓冲区
  pub fn with_staged<E, T>(
    &mut self,
    engine: &mut E,
    bitmap: &Bitmap,
    f: impl FnOnce(&mut E, &H) -> T,
  ) -> Result<T, ClassifierError>
  where
    E: NativeEngine<Handle = H>,
  {
    let handle = self.acquire(engine, bitmap)?;
    let output = f(engine, handle);
    self.release(engine);
    Ok(output)
  }
}
