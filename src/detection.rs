// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/detection.rs - 检测结果组装
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

use std::{collections::HashSet, sync::Arc, time::Duration};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
  catalog::{Catalog, Recipe},
  model::{DetectionProvider, RawDetection},
};

/// 组装完成、可直接展示的检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
  pub name: String,
  pub class_id: i64,
  /// 置信度百分比，保留两位小数
  pub confidence_percent: f64,
  pub bbox: [f32; 4],
  pub components: Vec<String>,
  pub benefits: Vec<String>,
  pub recipes: IndexMap<String, Recipe>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reference_image: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleOptions {
  /// 同名检测只保留第一个
  pub dedupe: bool,
}

/// 单帧的检测结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionResult {
  pub records: Vec<DetectionRecord>,
  /// 提供者返回的原始检测框，未经过滤与去重
  #[serde(skip)]
  pub raw: Vec<RawDetection>,
  #[serde(skip)]
  pub elapsed: Duration,
}

impl DetectionResult {
  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }
}

pub fn confidence_percent(confidence: f32) -> f64 {
  (f64::from(confidence) * 10000.0).round_ties_even() / 100.0
}

/// 将检测框与知识库资料合并。
///
/// 输出顺序与输入一致；类别索引越界的检测框会被跳过，不会中断整批处理。
pub fn assemble(
  raw_detections: &[RawDetection],
  catalog: &Catalog,
  dedupe: bool,
) -> Vec<DetectionRecord> {
  let mut records: Vec<DetectionRecord> = Vec::with_capacity(raw_detections.len());

  for detection in raw_detections {
    let name = match catalog.class_name_for(detection.class_id) {
      Ok(name) => name,
      Err(e) => {
        warn!("跳过检测框: {}", e);
        continue;
      }
    };

    let entry = catalog.entry_for(name);
    records.push(DetectionRecord {
      name: entry.name,
      class_id: detection.class_id,
      confidence_percent: confidence_percent(detection.confidence),
      bbox: detection.bbox,
      components: entry.components,
      benefits: entry.benefits,
      recipes: entry.recipes,
      reference_image: entry.reference_image,
    });
  }

  if dedupe {
    records = dedupe_by_name(records);
  }

  debug!(
    "组装完成: 输入 {} 个检测框, 输出 {} 条结果",
    raw_detections.len(),
    records.len()
  );
  records
}

fn dedupe_by_name(records: Vec<DetectionRecord>) -> Vec<DetectionRecord> {
  let mut seen = HashSet::new();
  records
    .into_iter()
    .filter(|record| seen.insert(record.name.clone()))
    .collect()
}

/// 检测模型与知识库的组合：一次调用完成检测和组装
pub struct Recognizer<P> {
  provider: P,
  catalog: Arc<Catalog>,
  options: AssembleOptions,
}

impl<P: DetectionProvider> Recognizer<P> {
  pub fn new(provider: P, catalog: Arc<Catalog>) -> Self {
    Recognizer {
      provider,
      catalog,
      options: AssembleOptions::default(),
    }
  }

  pub fn with_options(mut self, options: AssembleOptions) -> Self {
    self.options = options;
    self
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  pub fn recognize(&self, input: &P::Input) -> Result<DetectionResult, P::Error> {
    let now = std::time::Instant::now();
    let raw = self.provider.detect(input)?;
    let elapsed = now.elapsed();
    let records = assemble(&raw, &self.catalog, self.options.dedupe);
    Ok(DetectionResult {
      records,
      raw,
      elapsed,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn catalog() -> Catalog {
    Catalog::from_yaml_str(
      r#"
names: [Sirih, Jahe]
info:
  Sirih:
    components: [Kavikol]
    benefits: [Mengobati batuk, Antiseptik]
    recipes:
      Obat batuk:
        ingredients: [daun sirih]
        steps: [Rebus, Minum]
"#,
    )
    .unwrap()
  }

  fn raw(class_id: i64, confidence: f32) -> RawDetection {
    RawDetection::new(class_id, confidence, [1.0, 2.0, 3.0, 4.0])
  }

  #[test]
  fn empty_input_gives_empty_output() {
    assert!(assemble(&[], &catalog(), false).is_empty());
    assert!(assemble(&[], &catalog(), true).is_empty());
  }

  #[test]
  fn out_of_range_class_id_is_dropped() {
    let detections = [
      RawDetection::new(0, 0.91, [1.0, 2.0, 3.0, 4.0]),
      RawDetection::new(5, 0.80, [5.0, 6.0, 7.0, 8.0]),
    ];
    let records = assemble(&detections, &catalog(), false);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Sirih");
    assert_eq!(records[0].confidence_percent, 91.0);
    assert_eq!(records[0].bbox, [1.0, 2.0, 3.0, 4.0]);

    assert!(assemble(&[raw(-1, 0.5), raw(2, 0.5)], &catalog(), false).is_empty());
  }

  #[test]
  fn confidence_is_rounded_to_two_decimals() {
    assert_eq!(confidence_percent(0.8734), 87.34);
    assert_eq!(confidence_percent(0.91), 91.0);
    assert_eq!(confidence_percent(1.0), 100.0);
    assert_eq!(confidence_percent(0.0), 0.0);
    assert_eq!(confidence_percent(0.123456), 12.35);
  }

  #[test]
  fn confidence_ties_round_to_even() {
    assert_eq!(confidence_percent(0.03125), 3.12);
    assert_eq!(confidence_percent(0.15625), 15.62);
    assert_eq!(confidence_percent(0.28125), 28.12);
    assert_eq!(confidence_percent(0.09375), 9.38);
  }

  #[test]
  fn order_follows_input_not_confidence() {
    let records = assemble(&[raw(1, 0.2), raw(0, 0.9), raw(1, 0.5)], &catalog(), false);
    let summary: Vec<_> = records
      .iter()
      .map(|r| (r.name.as_str(), r.confidence_percent))
      .collect();
    assert_eq!(summary, vec![("Jahe", 20.0), ("Sirih", 90.0), ("Jahe", 50.0)]);
  }

  #[test]
  fn dedupe_keeps_first_occurrence() {
    let records = assemble(&[raw(1, 0.2), raw(0, 0.9), raw(1, 0.5)], &catalog(), true);
    let summary: Vec<_> = records
      .iter()
      .map(|r| (r.name.as_str(), r.confidence_percent))
      .collect();
    assert_eq!(summary, vec![("Jahe", 20.0), ("Sirih", 90.0)]);
  }

  #[test]
  fn records_carry_catalog_metadata() {
    let records = assemble(&[raw(0, 0.5), raw(1, 0.5)], &catalog(), false);
    assert_eq!(records[0].components, vec!["Kavikol"]);
    assert_eq!(records[0].recipes["Obat batuk"].steps, vec!["Rebus", "Minum"]);
    // Jahe 没有资料，结果中字段为空
    assert!(records[1].benefits.is_empty());
    assert!(records[1].recipes.is_empty());
  }

  #[test]
  fn assemble_does_not_touch_inputs() {
    let catalog = catalog();
    let detections = vec![raw(0, 0.5), raw(0, 0.6)];
    let before = detections.clone();
    let first = assemble(&detections, &catalog, true);
    let second = assemble(&detections, &catalog, true);
    assert_eq!(detections, before);
    assert_eq!(first, second);
    assert_eq!(catalog.entry_for("Sirih").benefits.len(), 2);
  }

  struct FixedProvider(Vec<RawDetection>);

  impl DetectionProvider for FixedProvider {
    type Input = ();
    type Error = std::convert::Infallible;

    fn detect(&self, _input: &()) -> Result<Vec<RawDetection>, Self::Error> {
      Ok(self.0.clone())
    }
  }

  #[test]
  fn recognizer_applies_options() {
    let provider = FixedProvider(vec![raw(0, 0.5), raw(0, 0.7), raw(9, 0.9)]);
    let recognizer = Recognizer::new(provider, Arc::new(catalog()));
    assert_eq!(recognizer.recognize(&()).unwrap().len(), 2);

    let provider = FixedProvider(vec![raw(0, 0.5), raw(0, 0.7), raw(9, 0.9)]);
    let recognizer = Recognizer::new(provider, Arc::new(catalog()))
      .with_options(AssembleOptions { dedupe: true });
    let result = recognizer.recognize(&()).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.records[0].confidence_percent, 50.0);
  }
}
