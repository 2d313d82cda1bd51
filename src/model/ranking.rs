// 该文件是 Lanjing （揽景） 项目的一部分。
// src/model/ranking.rs - 分数排序与截断
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

use tracing::warn;

use crate::model::LabelTable;

pub const DEFAULT_TOP_K: usize = 10;

/// 将每类一个分数的向量转为按分数降序的 (标签, 分数) 列表，最多保留 `k` 项。
///
/// - `scores` 为 `None` 时返回空列表
/// - 分数相同时保持标签表顺序（稳定排序）
/// - NaN 排在最后
///
/// 标签数与分数个数不一致时按较短者配对。
pub fn rank_predictions(
  labels: &LabelTable,
  scores: Option<&[f32]>,
  k: usize,
) -> Vec<(String, f32)> {
  let Some(scores) = scores else {
    return Vec::new();
  };

  if scores.len() != labels.len() {
    warn!(
      "分数个数 {} 与标签个数 {} 不一致",
      scores.len(),
      labels.len()
    );
  }

  let mut ranked: Vec<(&str, f32)> = labels.iter().zip(scores.iter().copied()).collect();
  ranked.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));
  ranked.truncate(k);

  ranked
    .into_iter()
    .map(|(label, score)| (label.to_string(), score))
    .collect()
}

fn rank_key(score: f32) -> f32 {
  if score.is_nan() {
    f32::NEG_INFINITY
  } else {
    score
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table() -> LabelTable {
    ["beach", "city", "forest"].into_iter().collect()
  }

  #[test]
  fn ranks_descending_and_truncates() {
    let ranked = rank_predictions(&table(), Some(&[0.2, 0.9, 0.5]), 2);
    assert_eq!(
      ranked,
      vec![("city".to_string(), 0.9), ("forest".to_string(), 0.5)]
    );
  }

  #[test]
  fn k_larger_than_input_returns_everything() {
    let ranked = rank_predictions(&table(), Some(&[0.2, 0.9, 0.5]), 10);
    assert_eq!(ranked.len(), 3);
    assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
  }

  #[test]
  fn empty_and_missing_scores_yield_nothing() {
    assert!(rank_predictions(&table(), Some(&[]), 5).is_empty());
    assert!(rank_predictions(&table(), None, 5).is_empty());
    assert!(rank_predictions(&LabelTable::default(), Some(&[]), 0).is_empty());
  }

  #[test]
  fn zero_k_yields_nothing() {
    assert!(rank_predictions(&table(), Some(&[0.1, 0.2, 0.3]), 0).is_empty());
  }

  #[test]
  fn repeated_scores_are_kept() {
    let ranked = rank_predictions(&table(), Some(&[0.5, 0.5, 0.7]), 3);
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].0, "forest");
    assert_eq!(ranked[1].1, 0.5);
    assert_eq!(ranked[2].1, 0.5);
  }

  #[test]
  fn nan_scores_rank_last() {
    let ranked = rank_predictions(&table(), Some(&[f32::NAN, 0.1, 0.3]), 3);
    assert_eq!(ranked[0].0, "forest");
    assert_eq!(ranked[1].0, "city");
    assert!(ranked[2].1.is_nan());
  }

  #[test]
  fn length_is_min_of_k_and_input() {
    let labels: LabelTable = (0..20).map(|i| i.to_string()).collect::<Vec<_>>().into();
    let scores: Vec<f32> = (0..20).map(|i| ((i * 7) % 13) as f32 / 13.0).collect();
    for k in [0, 1, 5, 10, 20, 50] {
      let ranked = rank_predictions(&labels, Some(&scores), k);
      assert_eq!(ranked.len(), k.min(scores.len()));
      assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }
  }
}
