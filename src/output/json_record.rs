// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/output/json_record.rs - JSON Lines 输出
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
  io::{BufWriter, Write},
  path::Path,
  sync::Mutex,
};

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{DetectionRecord, DetectionResult},
  frame::Frame,
  output::Render,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum JsonOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输出文件锁已失效")]
  Poisoned,
}

/// 每帧一行的 JSON 记录
#[derive(Serialize)]
pub struct FrameLine<'a> {
  pub frame: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<&'a Path>,
  pub elapsed_ms: f64,
  pub detections: &'a [DetectionRecord],
}

/// 以 JSON Lines 格式写入检测结果，每帧一行
pub struct JsonOutput {
  writer: Mutex<BufWriter<File>>,
}

impl FromUrlWithScheme for JsonOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonOutput {
  type Error = JsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::create(url_file_path(url))
  }
}

impl JsonOutput {
  pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, JsonOutputError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    info!("检测结果将写入: {}", path.display());
    Ok(JsonOutput {
      writer: Mutex::new(BufWriter::new(file)),
    })
  }
}

impl Render<Frame, DetectionResult> for JsonOutput {
  type Error = JsonOutputError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    let line = FrameLine {
      frame: frame.index(),
      source: frame.source(),
      elapsed_ms: result.elapsed.as_secs_f64() * 1000.0,
      detections: &result.records,
    };

    let mut writer = self.writer.lock().map_err(|_| JsonOutputError::Poisoned)?;
    serde_json::to_writer(&mut *writer, &line)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
  }
}
