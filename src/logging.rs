// 该文件是 Lanjing （揽景） 项目的一部分。
// src/logging.rs - 日志初始化
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

use tracing_subscriber::EnvFilter;

/// 安装 fmt 订阅器，过滤规则取自 `RUST_LOG`（默认 `info`）。
///
/// 已有全局订阅器时静默跳过，可重复调用。
pub fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
