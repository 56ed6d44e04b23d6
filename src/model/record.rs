// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/model/record.rs - 检测记录回放
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

//! 回放外部模型已经写好的检测记录。
//!
//! 每帧对应一个文本文件，每行一个检测框：
//!
//! ```text
//! # class_id, confidence, x_min, y_min, x_max, y_max
//! 0, 0.9100, 12.0, 30.5, 220.0, 310.0
//! ```
//!
//! `record:///dir` 在目录中查找 `<帧文件名>.txt`；
//! `record:` 不带路径时读取帧文件旁边的同名 `.txt`。

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  model::{DetectionProvider, RawDetection},
  url_file_path,
};

const RECORD_EXTENSION: &str = "txt";

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("第 {0} 帧没有来源文件，无法定位检测记录")]
  MissingSource(usize),
  #[error("无法读取检测记录 {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("检测记录第 {line} 行格式错误: {reason}")]
  Malformed { line: usize, reason: String },
}

/// 解析检测记录文本；空行和 `#` 开头的注释行会被忽略
pub fn parse_records(text: &str) -> Result<Vec<RawDetection>, RecordError> {
  let mut detections = Vec::new();

  for (index, line) in text.lines().enumerate() {
    let line_no = index + 1;
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 6 {
      return Err(RecordError::Malformed {
        line: line_no,
        reason: format!("期望 6 个字段, 实际 {} 个", fields.len()),
      });
    }

    let class_id = fields[0]
      .parse::<i64>()
      .map_err(|e| RecordError::Malformed {
        line: line_no,
        reason: format!("类别索引 '{}' 无效: {}", fields[0], e),
      })?;

    let mut values = [0f32; 5];
    for (slot, field) in values.iter_mut().zip(&fields[1..]) {
      *slot = field.parse::<f32>().map_err(|e| RecordError::Malformed {
        line: line_no,
        reason: format!("数值 '{}' 无效: {}", field, e),
      })?;
    }

    detections.push(RawDetection {
      class_id,
      confidence: values[0],
      bbox: [values[1], values[2], values[3], values[4]],
    });
  }

  Ok(detections)
}

pub struct RecordProvider {
  directory: Option<PathBuf>,
}

impl FromUrlWithScheme for RecordProvider {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordProvider {
  type Error = RecordError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(RecordError::SchemeMismatch(url.scheme().to_string()));
    }

    let directory = url_file_path(url);
    let directory = if directory.as_os_str().is_empty() {
      None
    } else {
      Some(directory)
    };

    Ok(RecordProvider { directory })
  }
}

impl RecordProvider {
  pub fn sidecar() -> Self {
    RecordProvider { directory: None }
  }

  pub fn with_directory<P: AsRef<Path>>(directory: P) -> Self {
    RecordProvider {
      directory: Some(directory.as_ref().to_path_buf()),
    }
  }

  fn record_path(&self, frame: &Frame) -> Result<PathBuf, RecordError> {
    let source = frame
      .source()
      .ok_or(RecordError::MissingSource(frame.index()))?;

    Ok(match &self.directory {
      Some(directory) => {
        let stem = source
          .file_stem()
          .map(|s| s.to_string_lossy().into_owned())
          .unwrap_or_default();
        directory.join(format!("{}.{}", stem, RECORD_EXTENSION))
      }
      None => source.with_extension(RECORD_EXTENSION),
    })
  }
}

impl DetectionProvider for RecordProvider {
  type Input = Frame;
  type Error = RecordError;

  fn detect(&self, input: &Self::Input) -> Result<Vec<RawDetection>, Self::Error> {
    let path = self.record_path(input)?;
    debug!("读取检测记录: {}", path.display());

    let text = match std::fs::read_to_string(&path) {
      Ok(text) => text,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        // 模型没有检测到任何物体时不会写记录
        debug!("检测记录不存在, 视为无检测结果: {}", path.display());
        return Ok(Vec::new());
      }
      Err(source) => {
        return Err(RecordError::Io {
          path: path.display().to_string(),
          source,
        });
      }
    };

    let detections = parse_records(&text)?;
    debug!("读取到 {} 个检测框", detections.len());
    Ok(detections)
  }
}
