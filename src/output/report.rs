// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/output/report.rs - 文本报告
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

use std::io::Write;

use indexmap::IndexMap;
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  catalog::{CatalogEntry, Recipe},
  detection::{DetectionRecord, DetectionResult},
  frame::Frame,
  output::Render,
};

fn write_details<W: Write>(
  w: &mut W,
  components: &[String],
  benefits: &[String],
  recipes: &IndexMap<String, Recipe>,
  reference_image: Option<&str>,
) -> std::io::Result<()> {
  if !components.is_empty() {
    writeln!(w, "  成分: {}", components.join(", "))?;
  }
  if !benefits.is_empty() {
    writeln!(w, "  功效:")?;
    for benefit in benefits {
      writeln!(w, "    - {}", benefit)?;
    }
  }
  if !recipes.is_empty() {
    writeln!(w, "  传统配方:")?;
    for (title, recipe) in recipes {
      writeln!(w, "    [{}]", title)?;
      writeln!(w, "      材料:")?;
      for ingredient in &recipe.ingredients {
        writeln!(w, "        - {}", ingredient)?;
      }
      writeln!(w, "      做法:")?;
      for (i, step) in recipe.steps.iter().enumerate() {
        writeln!(w, "        {}. {}", i + 1, step)?;
      }
    }
  }
  if let Some(image) = reference_image {
    writeln!(w, "  参考图片: {}", image)?;
  }
  Ok(())
}

pub fn write_record<W: Write>(w: &mut W, record: &DetectionRecord) -> std::io::Result<()> {
  writeln!(w, "{} ({}%)", record.name, record.confidence_percent)?;
  write_details(
    w,
    &record.components,
    &record.benefits,
    &record.recipes,
    record.reference_image.as_deref(),
  )
}

pub fn write_entry<W: Write>(w: &mut W, entry: &CatalogEntry) -> std::io::Result<()> {
  writeln!(w, "{}", entry.name)?;
  write_details(
    w,
    &entry.components,
    &entry.benefits,
    &entry.recipes,
    entry.reference_image.as_deref(),
  )
}

pub fn write_result<W: Write>(
  w: &mut W,
  frame: &Frame,
  result: &DetectionResult,
) -> std::io::Result<()> {
  let source = frame
    .source()
    .map(|p| p.display().to_string())
    .unwrap_or_else(|| "-".to_string());
  writeln!(
    w,
    "帧 {} ({}): 检测到 {} 片叶子, 耗时 {:.3} 秒",
    frame.index(),
    source,
    result.len(),
    result.elapsed.as_secs_f64()
  )?;
  if result.is_empty() {
    writeln!(w, "未检测到叶片，请换一张图片再试。")?;
  }
  for record in &result.records {
    write_record(w, record)?;
  }
  Ok(())
}

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 将检测结果以文本形式输出到标准输出
pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(ConsoleOutput)
  }
}

impl Render<Frame, DetectionResult> for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_result(&mut lock, frame, result)?;
    lock.flush()?;
    Ok(())
  }
}
