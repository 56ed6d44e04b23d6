// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  detection::{DetectionRecord, DetectionResult},
  frame::Frame,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_PADDING: i32 = 3;
const BOX_THICKNESS: i32 = 3;
const LABEL_TEXT_COLOR: [u8; 3] = [0, 0, 0];

/// 每个类别固定一种颜色
const CLASS_PALETTE: [[u8; 3]; 12] = [
  [102, 220, 225],
  [95, 179, 61],
  [234, 203, 92],
  [255, 115, 0],
  [231, 76, 60],
  [155, 89, 182],
  [52, 152, 219],
  [46, 204, 113],
  [241, 196, 15],
  [230, 126, 34],
  [26, 188, 156],
  [236, 112, 200],
];

pub fn class_color(class_id: i64) -> [u8; 3] {
  CLASS_PALETTE[class_id.rem_euclid(CLASS_PALETTE.len() as i64) as usize]
}

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(String),
}

/// 在图像上绘制检测框；只有提供字体时才绘制标签文字
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self, DrawError> {
    let path = path.as_ref();
    info!("加载标签字体: {}", path.display());
    let data = std::fs::read(path)?;
    let font = FontVec::try_from_vec(data)
      .map_err(|_| DrawError::InvalidFont(path.display().to_string()))?;
    Ok(Self {
      font: Some(font),
      ..Default::default()
    })
  }

  pub fn draw_detection(&self, frame: &Frame, result: &DetectionResult) -> RgbImage {
    let mut image = frame.image().clone();
    self.draw_detections_on_image(&mut image, result);
    image
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectionResult) {
    for record in result.records.iter() {
      self.draw_bbox_with_label(image, record);
    }
  }

  // bbox 为像素坐标，提供方不保证 x_min < x_max
  fn draw_bbox_with_label(&self, image: &mut RgbImage, record: &DetectionRecord) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let [x1, y1, x2, y2] = record.bbox;
    let x_min = (x1.min(x2).floor() as i32).clamp(0, w - 1);
    let y_min = (y1.min(y2).floor() as i32).clamp(0, h - 1);
    let x_max = (x1.max(x2).ceil() as i32).clamp(0, w - 1);
    let y_max = (y1.max(y2).ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      debug!("检测框 {} 退化，跳过绘制", record.name);
      return;
    }

    let color = Rgb(class_color(record.class_id));
    for t in 0..self.thickness {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32 + 1, height as u32 + 1);
      draw_hollow_rect_mut(image, rect, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.1}%", record.name, record.confidence_percent);
    let scale = PxScale::from(self.font_size);
    let (text_w, text_h) = text_size(scale, font, &label);
    let label_h = text_h as i32 + 2 * LABEL_PADDING;
    let label_w = text_w as i32 + 2 * LABEL_PADDING;

    // 标签在框的上方，放不下时放在框内
    let label_y = if y_min >= label_h { y_min - label_h } else { y_min };
    let label_w = label_w.min(w - x_min);
    if label_w <= 0 {
      return;
    }

    let background = Rect::at(x_min, label_y).of_size(label_w as u32, label_h as u32);
    draw_filled_rect_mut(image, background, color);
    draw_text_mut(
      image,
      Rgb(LABEL_TEXT_COLOR),
      x_min + LABEL_PADDING,
      label_y + LABEL_PADDING,
      scale,
      font,
      &label,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use indexmap::IndexMap;

  fn record(class_id: i64, bbox: [f32; 4]) -> DetectionRecord {
    DetectionRecord {
      name: "Sirih".to_string(),
      class_id,
      confidence_percent: 91.0,
      bbox,
      components: vec![],
      benefits: vec![],
      recipes: IndexMap::new(),
      reference_image: None,
    }
  }

  #[test]
  fn class_color_is_stable_and_total() {
    assert_eq!(class_color(0), class_color(12));
    assert_eq!(class_color(-1), class_color(11));
    assert_ne!(class_color(0), class_color(1));
  }

  #[test]
  fn draws_box_edges_in_class_color() {
    let frame = Frame::from(RgbImage::new(64, 64));
    let result = DetectionResult {
      records: vec![record(1, [40.0, 50.0, 10.0, 20.0])],
      ..Default::default()
    };
    let image = Draw::default().draw_detection(&frame, &result);
    assert_eq!(image.get_pixel(10, 20), &Rgb(class_color(1)));
    assert_eq!(image.get_pixel(40, 35), &Rgb(class_color(1)));
    assert_eq!(image.get_pixel(25, 35), &Rgb([0, 0, 0]));
  }

  #[test]
  fn degenerate_box_is_ignored() {
    let frame = Frame::from(RgbImage::new(16, 16));
    let result = DetectionResult {
      records: vec![record(0, [5.0, 5.0, 5.0, 9.0]), record(0, [-50.0, -50.0, -10.0, -10.0])],
      ..Default::default()
    };
    let image = Draw::default().draw_detection(&frame, &result);
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }
}
