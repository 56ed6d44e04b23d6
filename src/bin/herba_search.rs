// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/bin/herba_search.rs - 按功效检索草药
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use herbasmart::{FromUrl, catalog::Catalog, output::report::write_entry, search::search};
use tracing::info;

/// HerbaSmart 功效检索参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 知识库文件，例如 catalog:///data/data-baru.yaml
  #[arg(long, value_name = "CATALOG")]
  pub catalog: Url,
  /// 要查找的功效或症状（例如 batuk、demam）
  #[arg(long, value_name = "QUERY")]
  pub query: String,
  /// 以 JSON 格式输出
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("知识库: {}", args.catalog);
  info!("检索: {}", args.query);

  let catalog = Catalog::from_url(&args.catalog)?;
  let hits = search(&args.query, &catalog);

  let stdout = std::io::stdout();
  let mut out = stdout.lock();

  if args.json {
    serde_json::to_writer_pretty(&mut out, &hits)?;
    writeln!(out)?;
    return Ok(());
  }

  if hits.is_empty() {
    writeln!(out, "未找到具有该功效的草药，请换个关键词再试。")?;
    return Ok(());
  }

  for hit in &hits {
    write_entry(&mut out, &hit.entry)?;
  }

  Ok(())
}
