// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/input/directory_input.rs - 目录图像序列输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::Frame, input::read_image_file::load_frame,
  url_file_path,
};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum DirectoryInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无法读取目录 {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// 按文件名顺序逐帧读取目录中的图片。
/// 无法解码的文件会被记录并跳过。
pub struct DirectoryInput {
  files: std::vec::IntoIter<PathBuf>,
  index: usize,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = DirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DirectoryInputError::SchemeMismatch(
        url.scheme().to_string(),
      ));
    }

    Self::open(url_file_path(url))
  }
}

fn is_image_file(path: &Path) -> bool {
  path.is_file()
    && path
      .extension()
      .map(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        IMAGE_EXTENSIONS.contains(&ext.as_str())
      })
      .unwrap_or(false)
}

impl DirectoryInput {
  pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self, DirectoryInputError> {
    let directory = directory.as_ref();
    let io_error = |source: std::io::Error| DirectoryInputError::Io {
      path: directory.display().to_string(),
      source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_error)? {
      let path = entry.map_err(io_error)?.path();
      if is_image_file(&path) {
        files.push(path);
      }
    }
    files.sort();

    info!("目录 {} 中共有 {} 张图片", directory.display(), files.len());
    Ok(DirectoryInput {
      files: files.into_iter(),
      index: 0,
    })
  }
}

impl Iterator for DirectoryInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      match load_frame(&path, self.index) {
        Ok(frame) => {
          self.index += 1;
          return Some(frame);
        }
        Err(e) => {
          error!("跳过无法读取的图像 {}: {}", path.display(), e);
        }
      }
    }
    None
  }
}
