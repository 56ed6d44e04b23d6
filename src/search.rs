// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/search.rs - 按功效检索
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

use serde::Serialize;
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
  pub name: String,
  pub entry: CatalogEntry,
}

impl SearchHit {
  /// 标题中包含查询词的配方（不区分大小写）
  pub fn matching_recipes<'a>(&'a self, query: &str) -> Vec<(&'a str, &'a Recipe)> {
    let query = query.to_lowercase();
    self
      .entry
      .recipes
      .iter()
      .filter(|(title, _)| title.to_lowercase().contains(&query))
      .map(|(title, recipe)| (title.as_str(), recipe))
      .collect()
  }
}

/// 查找功效中包含查询词的条目，不区分大小写，按知识库顺序返回。
/// 空查询返回空结果。
pub fn search(query: &str, catalog: &Catalog) -> Vec<SearchHit> {
  if query.trim().is_empty() {
    return Vec::new();
  }

  let needle = query.to_lowercase();
  let hits: Vec<SearchHit> = catalog
    .entries()
    .filter(|entry| {
      entry
        .benefits
        .iter()
        .any(|benefit| benefit.to_lowercase().contains(&needle))
    })
    .map(|entry| SearchHit {
      name: entry.name.clone(),
      entry: entry.clone(),
    })
    .collect();

  debug!("检索 '{}': 命中 {} 条", query, hits.len());
  hits
}
