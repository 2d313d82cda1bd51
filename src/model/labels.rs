// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model/labels.rs - 类别标签表
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
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use tracing::info;

/// 标签表，下标与引擎的类别编号一一对应
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
  labels: Box<[String]>,
}

impl LabelTable {
  pub fn load(path: &Path) -> Result<Self, std::io::Error> {
    let reader = BufReader::new(File::open(path)?);
    let labels = reader
      .lines()
      .map(|line| line.map(|l| parse_label(&l)))
      .collect::<Result<Vec<_>, _>>()?;
    info!("加载标签 {} 个: {}", labels.len(), path.display());
    Ok(Self::from(labels))
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.labels.get(index).map(String::as_str)
  }

  pub fn contains(&self, label: &str) -> bool {
    self.labels.iter().any(|l| l == label)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}

impl From<Vec<String>> for LabelTable {
  fn from(labels: Vec<String>) -> Self {
    Self {
      labels: labels.into_boxed_slice(),
    }
  }
}

impl<'a> FromIterator<&'a str> for LabelTable {
  fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
    Self::from(iter.into_iter().map(str::to_string).collect::<Vec<_>>())
  }
}

// `/a/abbey 0` -> `abbey`，`n01440764 tench` -> `n01440764`
// 空行保留，保证下标对齐
fn parse_label(line: &str) -> String {
  let tail = line.rsplit('/').next().unwrap_or(line);
  tail.split(' ').next().unwrap_or_default().to_string()
}
