// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{Datelike, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::DetectionResult,
  frame::Frame,
  output::{
    Render,
    draw::{Draw, DrawError},
    save_image_file::draw_from_query,
  },
  url_file_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("字体错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("帧计数器锁已失效")]
  Poisoned,
}

/// 保存方式：标注图 + JSON，或原图 + 可回放的检测记录
pub enum DrawWrapper {
  Draw(Box<Draw>),
  Record,
}

impl DrawWrapper {
  pub fn save_result(
    &self,
    path: &Path,
    frame: &Frame,
    result: &DetectionResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      DrawWrapper::Draw(draw) => {
        let image = draw.draw_detection(frame, result);
        image.save(path)?;
        let sidecar = std::fs::File::create(path.with_extension("json"))?;
        serde_json::to_writer_pretty(sidecar, &result.records)?;
      }
      DrawWrapper::Record => {
        frame.image().save(path)?;
        std::fs::write(path.with_extension("txt"), record_lines(result))?;
      }
    };

    Ok(())
  }
}

/// 以 `record://` 格式写出提供者的原始检测框，回放时得到同样的输入
pub fn record_lines(result: &DetectionResult) -> String {
  result
    .raw
    .iter()
    .map(|raw| {
      format!(
        "{}, {}, {}, {}, {}, {}",
        raw.class_id, raw.confidence, raw.bbox[0], raw.bbox[1], raw.bbox[2], raw.bbox[3]
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counter: Mutex<u16>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let draw = if uri.query_pairs().any(|(k, _)| k == "record") {
      DrawWrapper::Record
    } else {
      DrawWrapper::Draw(Box::new(draw_from_query(uri)?))
    };

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: url_file_path(uri),
      draw,
      frame_counter: Mutex::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new<P: AsRef<Path>>(directory: P, draw: DrawWrapper, always: bool) -> Self {
    DirectoryRecordOutput {
      directory: directory.as_ref().to_path_buf(),
      draw,
      frame_counter: Mutex::new(0),
      always,
    }
  }

  fn frame_id(&self) -> Result<u16, DirectoryRecordOutputError> {
    let mut counter = self
      .frame_counter
      .lock()
      .map_err(|_| DirectoryRecordOutputError::Poisoned)?;
    let id = counter.wrapping_add(1);
    *counter = id;
    Ok(id)
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()?
    )))
  }
}

impl Render<Frame, DetectionResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("第 {} 帧没有检测结果, 不保存", frame.index());
      return Ok(());
    }
    let path = self.frame_path()?;
    self.draw.save_result(&path, frame, result)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{catalog::Catalog, detection::assemble, model::RawDetection, model::parse_records};

  #[test]
  fn record_lines_can_be_replayed() {
    let catalog = Catalog::from_yaml_str("names: [Sirih, Jahe]\n").unwrap();
    let raw = vec![
      RawDetection::new(1, 0.873_456_7, [10.25, 20.0, 30.125, 40.0]),
      RawDetection::new(7, 0.6, [0.0, 0.0, 1.0, 1.0]),
      RawDetection::new(1, 0.5, [1.5, 2.5, 3.5, 4.5]),
    ];
    let result = DetectionResult {
      records: assemble(&raw, &catalog, true),
      raw: raw.clone(),
      ..Default::default()
    };
    assert_eq!(result.records.len(), 1);

    let replayed = parse_records(&record_lines(&result)).unwrap();
    assert_eq!(replayed, raw);
  }
}
