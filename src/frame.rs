// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/frame.rs - 帧定义
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

use image::RgbImage;

/// 一帧输入图像，以及它的来源文件（如果有）
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
  source: Option<PathBuf>,
  index: usize,
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    Frame {
      image,
      source: None,
      index: 0,
    }
  }
}

impl Frame {
  pub fn new(image: RgbImage, index: usize) -> Self {
    Frame {
      image,
      source: None,
      index,
    }
  }

  pub fn with_source<P: AsRef<Path>>(mut self, source: P) -> Self {
    self.source = Some(source.as_ref().to_path_buf());
    self
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn source(&self) -> Option<&Path> {
    self.source.as_deref()
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}
