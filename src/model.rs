// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/model.rs - 检测结果提供者
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

use serde::{Deserialize, Serialize};

/// 外部检测模型的接入点。模型的格式、权重和推理引擎都不在本库范围内，
/// 这里只消费它给出的检测框列表。
pub trait DetectionProvider {
  type Input;
  type Error;

  fn detect(&self, input: &Self::Input) -> Result<Vec<RawDetection>, Self::Error>;
}

/// 检测模型输出的单个检测框
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
  /// 类别索引，对应知识库 `names` 中的位置
  pub class_id: i64,
  /// 置信度 [0, 1]
  pub confidence: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，像素坐标
}

impl RawDetection {
  pub fn new(class_id: i64, confidence: f32, bbox: [f32; 4]) -> Self {
    RawDetection {
      class_id,
      confidence,
      bbox,
    }
  }
}

mod record;
pub use self::record::{RecordError, RecordProvider, parse_records};
