// 该文件是 Lanjing （揽景） 项目的一部分。
// tests/support/mod.rs - 测试用的记录型引擎
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

#![allow(dead_code)]

use std::{
  collections::HashSet,
  path::{Path, PathBuf},
  sync::{Arc, Mutex, mpsc},
};

use lanjing::{
  engine::{DetectorEngine, EngineError, NativeEngine, SceneEngine},
  frame::Bitmap,
  model::{BoundingBox, DetectionResult, ModelDescriptor},
};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  LoadModel,
  ReleaseModel,
  Stage(u64),
  Unstage(u64),
  SetSelectedLabel(String),
  SetInputDim(u32, u32),
  DetectPath,
  DetectStaged(u64),
  Detection(usize),
  ScoresPath,
  ScoresStaged(u64),
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
  fn push(&self, call: Call) {
    self.0.lock().unwrap().push(call);
  }

  pub fn calls(&self) -> Vec<Call> {
    self.0.lock().unwrap().clone()
  }

  pub fn clear(&self) {
    self.0.lock().unwrap().clear();
  }

  pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
    self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
  }

  pub fn staged(&self) -> usize {
    self.count(|c| matches!(c, Call::Stage(_)))
  }

  pub fn unstaged(&self) -> usize {
    self.count(|c| matches!(c, Call::Unstage(_)))
  }
}

/// 推理时阻塞，直到测试放行
pub struct Gate {
  pub entered: mpsc::Sender<()>,
  pub release: mpsc::Receiver<()>,
}

impl Gate {
  fn pass(&self) {
    let _ = self.entered.send(());
    let _ = self.release.recv();
  }
}

#[derive(Default)]
pub struct MockDetector {
  pub log: CallLog,
  pub detections: usize,
  pub failing: HashSet<usize>,
  pub fail_count: bool,
  pub fail_detections: bool,
  pub fail_stage: bool,
  pub fail_load: bool,
  pub gate: Option<Gate>,
  next_handle: u64,
}

impl MockDetector {
  pub fn new(log: CallLog, detections: usize) -> Self {
    Self {
      log,
      detections,
      ..Default::default()
    }
  }

  pub fn failing_at(mut self, index: usize) -> Self {
    self.failing.insert(index);
    self
  }
}

impl NativeEngine for MockDetector {
  type Handle = u64;

  fn load_model(&mut self, _descriptor: &ModelDescriptor) -> Result<(), EngineError> {
    self.log.push(Call::LoadModel);
    if self.fail_load {
      self.fail_load = false;
      return Err(EngineError::Status {
        call: "load_model",
        code: -1,
      });
    }
    Ok(())
  }

  fn release_model(&mut self) -> Result<(), EngineError> {
    self.log.push(Call::ReleaseModel);
    Ok(())
  }

  fn stage(&mut self, _bitmap: &Bitmap) -> Result<u64, EngineError> {
    if self.fail_stage {
      return Err(EngineError::UnsupportedImage("mock".to_string()));
    }
    self.next_handle += 1;
    self.log.push(Call::Stage(self.next_handle));
    Ok(self.next_handle)
  }

  fn unstage(&mut self, handle: u64) {
    self.log.push(Call::Unstage(handle));
  }
}

impl DetectorEngine for MockDetector {
  fn set_selected_label(&mut self, label: &str) -> Result<(), EngineError> {
    self.log.push(Call::SetSelectedLabel(label.to_string()));
    Ok(())
  }

  fn detect_path(&mut self, _path: &Path) -> Result<usize, EngineError> {
    self.log.push(Call::DetectPath);
    if let Some(gate) = &self.gate {
      gate.pass();
    }
    if self.fail_count {
      return Err(EngineError::Status {
        call: "detect_path",
        code: -3,
      });
    }
    Ok(self.detections)
  }

  fn detect_staged(&mut self, handle: &u64) -> Result<usize, EngineError> {
    self.log.push(Call::DetectStaged(*handle));
    Ok(self.detections)
  }

  fn detection(&mut self, index: usize) -> Result<DetectionResult, EngineError> {
    self.log.push(Call::Detection(index));
    if self.fail_detections || self.failing.contains(&index) || index >= self.detections {
      return Err(EngineError::IndexOutOfRange { index });
    }
    let offset = index as i32 * 10;
    Ok(DetectionResult::new(
      format!("object{index}"),
      0.9 - index as f32 * 0.1,
      BoundingBox::new(offset, offset, offset + 50, offset + 60),
    ))
  }
}

#[derive(Default)]
pub struct MockScene {
  pub log: CallLog,
  pub scores: Option<Vec<f32>>,
  next_handle: u64,
}

impl MockScene {
  pub fn new(log: CallLog, scores: Option<Vec<f32>>) -> Self {
    Self {
      log,
      scores,
      next_handle: 0,
    }
  }
}

impl NativeEngine for MockScene {
  type Handle = u64;

  fn load_model(&mut self, _descriptor: &ModelDescriptor) -> Result<(), EngineError> {
    self.log.push(Call::LoadModel);
    Ok(())
  }

  fn release_model(&mut self) -> Result<(), EngineError> {
    self.log.push(Call::ReleaseModel);
    Ok(())
  }

  fn stage(&mut self, _bitmap: &Bitmap) -> Result<u64, EngineError> {
    self.next_handle += 1;
    self.log.push(Call::Stage(self.next_handle));
    Ok(self.next_handle)
  }

  fn unstage(&mut self, handle: u64) {
    self.log.push(Call::Unstage(handle));
  }
}

impl SceneEngine for MockScene {
  fn set_input_dim(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
    self.log.push(Call::SetInputDim(width, height));
    Ok(())
  }

  fn scores_path(&mut self, _path: &Path) -> Option<Vec<f32>> {
    self.log.push(Call::ScoresPath);
    self.scores.clone()
  }

  fn scores_staged(&mut self, handle: &u64) -> Option<Vec<f32>> {
    self.log.push(Call::ScoresStaged(*handle));
    self.scores.clone()
  }
}

pub fn init_runtime() {
  lanjing::logging::init_logging();
  lanjing::runtime::initialize(&["objrek", "objrek_jni"], |_| Ok(())).unwrap();
}

/// 临时目录中的模型、权重与标签文件
pub struct ModelFiles {
  pub dir: TempDir,
  pub descriptor: ModelDescriptor,
}

impl ModelFiles {
  pub fn new(labels: &[&str]) -> Self {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("deploy.prototxt");
    let weights = dir.path().join("weights.caffemodel");
    let synset = dir.path().join("synset");
    std::fs::write(&model, "name: \"mock\"").unwrap();
    std::fs::write(&weights, [0u8; 16]).unwrap();
    let lines: Vec<String> = labels.iter().map(|l| format!("/x/{l} 0")).collect();
    std::fs::write(&synset, lines.join("\n")).unwrap();

    let descriptor = ModelDescriptor::new(model, weights, synset);
    Self { dir, descriptor }
  }

  /// 写入一张小 PNG 图像
  pub fn image(&self, name: &str) -> PathBuf {
    let path = self.dir.path().join(name);
    image::RgbImage::from_pixel(4, 4, image::Rgb([128, 64, 32]))
      .save(&path)
      .unwrap();
    path
  }
}

pub fn bitmap() -> Bitmap {
  Bitmap::zeroed(8, 8)
}
