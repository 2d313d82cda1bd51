// 该文件是 Lanjing （揽景） 项目的一部分。
// src/output.rs - 分类结果输出
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{Datelike, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectionResult,
  task::ClassificationReport,
};

/// 展示时忽略的背景类别
const BACKGROUND_LABEL: &str = "background";

pub trait Render<Output> {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("不支持的记录格式: {0}")]
  UnknownFormat(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 通过日志输出结果
#[derive(Debug, Default)]
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    Ok(LogOutput)
  }
}

impl Render<ClassificationReport> for LogOutput {
  type Error = OutputError;

  fn render_result(&self, report: &ClassificationReport) -> Result<(), Self::Error> {
    info!(
      "{} 耗时 {:.3} 秒",
      report.path.display(),
      report.elapsed.as_secs_f64()
    );
    match &report.results {
      Ok(results) => {
        for item in results.iter().filter(|r| !is_background(r)) {
          info!("{}", describe(item));
        }
      }
      Err(e) => error!("分类失败: {}", e),
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
  Text,
  Json,
}

impl RecordFormat {
  fn extension(&self) -> &'static str {
    match self {
      RecordFormat::Text => "txt",
      RecordFormat::Json => "json",
    }
  }
}

/// 将结果按日期写入目录：`YYYY/MM/DD/HH-MM-SS-NNNN.{txt,json}`
#[derive(Debug)]
pub struct RecordOutput {
  directory: PathBuf,
  format: RecordFormat,
  counter: AtomicU16,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }

    let format = match url.query_pairs().find(|(k, _)| k == "format") {
      None => RecordFormat::Text,
      Some((_, v)) if v == "txt" || v == "text" => RecordFormat::Text,
      Some((_, v)) if v == "json" => RecordFormat::Json,
      Some((_, v)) => return Err(OutputError::UnknownFormat(v.into_owned())),
    };

    let directory = urlencoding::decode(url.path())
      .map(|p| p.into_owned())
      .unwrap_or_else(|_| url.path().to_string());
    Ok(RecordOutput::new(directory, format))
  }
}

impl RecordOutput {
  pub fn new(directory: impl Into<PathBuf>, format: RecordFormat) -> Self {
    Self {
      directory: directory.into(),
      format,
      counter: AtomicU16::new(0),
    }
  }

  fn record_id(&self) -> u16 {
    self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn record_path(&self) -> Result<PathBuf, OutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.{}",
      now.format("%H-%M-%S"),
      self.record_id(),
      self.format.extension()
    )))
  }

  fn write_text(path: &Path, report: &ClassificationReport) -> Result<(), OutputError> {
    let lines = match &report.results {
      Ok(results) => results
        .iter()
        .map(|item| {
          let b = item.bounding_box;
          format!(
            "{}, {:.4}, {}, {}, {}, {}",
            item.label, item.confidence, b.left, b.top, b.right, b.bottom
          )
        })
        .collect::<Vec<_>>(),
      Err(e) => vec![format!("error, {}", e)],
    };
    std::fs::write(path, lines.join("\n"))?;
    Ok(())
  }

  fn write_json(path: &Path, report: &ClassificationReport) -> Result<(), OutputError> {
    let (results, error) = match &report.results {
      Ok(results) => (
        results
          .iter()
          .map(|item| {
            let b = item.bounding_box;
            json!({
              "label": item.label,
              "confidence": item.confidence,
              "box": [b.left, b.top, b.right, b.bottom],
            })
          })
          .collect::<Vec<_>>(),
        None,
      ),
      Err(e) => (Vec::new(), Some(e.to_string())),
    };

    let record = json!({
      "path": report.path.display().to_string(),
      "elapsed_ms": report.elapsed.as_millis() as u64,
      "finished_at": report.finished_at.to_rfc3339(),
      "results": results,
      "error": error,
    });
    std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
    Ok(())
  }
}

impl Render<ClassificationReport> for RecordOutput {
  type Error = OutputError;

  fn render_result(&self, report: &ClassificationReport) -> Result<(), Self::Error> {
    let path = self.record_path()?;
    match self.format {
      RecordFormat::Text => Self::write_text(&path, report)?,
      RecordFormat::Json => Self::write_json(&path, report)?,
    }
    info!("结果已记录: {}", path.display());
    Ok(())
  }
}

pub enum OutputWrapper {
  Log(LogOutput),
  Record(RecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() == LogOutput::SCHEME {
      return Ok(OutputWrapper::Log(LogOutput::from_url(url)?));
    }
    if url.scheme() == RecordOutput::SCHEME {
      return Ok(OutputWrapper::Record(RecordOutput::from_url(url)?));
    }
    Err(OutputError::SchemeMismatch)
  }
}

impl Render<ClassificationReport> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, report: &ClassificationReport) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => output.render_result(report),
      OutputWrapper::Record(output) => output.render_result(report),
    }
  }
}

fn is_background(item: &DetectionResult) -> bool {
  item.label.eq_ignore_ascii_case(BACKGROUND_LABEL)
}

fn describe(item: &DetectionResult) -> String {
  let b = item.bounding_box;
  format!(
    "{}, Prob: {} [{},{},{},{}]",
    item.label, item.confidence, b.left, b.top, b.right, b.bottom
  )
}
