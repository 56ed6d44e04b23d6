// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/catalog.rs - 草药知识库
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

//! # 知识库
//!
//! 知识库从 YAML 文件加载，文件包含两个顶层字段：
//!
//! ```yaml
//! names: [Sirih, Jahe]
//! info:
//!   Sirih:
//!     components: [Kavikol, Eugenol]
//!     benefits: [Mengobati batuk, Antiseptik]
//!     recipes:
//!       Obat batuk:
//!         ingredients: [5 lembar daun sirih, 2 gelas air]
//!         steps: [Rebus daun sirih, Minum selagi hangat]
//!     gambar: assets/sirih.jpg
//! ```
//!
//! `names` 是模型输出的类别索引到名称的映射表，必须存在；
//! `info` 中没有出现的名称视为“没有可展示的资料”，不是错误。

use std::{io::Read, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_file_path};

/// 旧格式（单个 `bahan`/`cara` 配方）归一化后使用的标题
pub const LEGACY_RECIPE_TITLE: &str = "Resep Tradisional";

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无法打开知识库文件 {path}: {source}")]
  Open {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("知识库解析错误: {0}")]
  Parse(#[from] serde_yaml::Error),
  #[error("知识库缺少 `names` 字段")]
  MissingNames,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("类别索引越界: {class_id} 不在 [0, {len}) 范围内")]
pub struct IndexOutOfRange {
  pub class_id: i64,
  pub len: usize,
}

/// 传统配方
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
  #[serde(default, alias = "bahan", deserialize_with = "null_as_empty")]
  pub ingredients: Vec<String>,
  /// 步骤按位置隐式编号 1..N
  #[serde(default, alias = "cara", deserialize_with = "null_as_empty")]
  pub steps: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// 单个类别的资料
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogEntry {
  pub name: String,
  pub components: Vec<String>,
  pub benefits: Vec<String>,
  pub recipes: IndexMap<String, Recipe>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reference_image: Option<String>,
}

impl CatalogEntry {
  pub fn empty(name: &str) -> Self {
    CatalogEntry {
      name: name.to_string(),
      ..Default::default()
    }
  }

  /// 没有任何可展示的资料
  pub fn has_no_metadata(&self) -> bool {
    self.components.is_empty()
      && self.benefits.is_empty()
      && self.recipes.is_empty()
      && self.reference_image.is_none()
  }
}

#[derive(Deserialize)]
struct CatalogDocument {
  names: Option<Vec<String>>,
  #[serde(default)]
  info: Option<IndexMap<String, Option<EntryDocument>>>,
}

#[derive(Deserialize, Default)]
struct EntryDocument {
  #[serde(default)]
  components: Option<Vec<String>>,
  #[serde(default)]
  benefits: Option<Vec<String>>,
  #[serde(default)]
  recipes: Option<RecipesDocument>,
  #[serde(
    default,
    rename = "referenceImage",
    alias = "gambar",
    alias = "reference_image"
  )]
  reference_image: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecipesDocument {
  Legacy(LegacyRecipe),
  Titled(IndexMap<String, Option<Recipe>>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LegacyRecipe {
  #[serde(default)]
  bahan: Vec<String>,
  #[serde(default)]
  cara: Vec<String>,
}

impl RecipesDocument {
  fn into_recipes(self) -> IndexMap<String, Recipe> {
    match self {
      RecipesDocument::Titled(recipes) => recipes
        .into_iter()
        .map(|(title, recipe)| (title, recipe.unwrap_or_default()))
        .collect(),
      RecipesDocument::Legacy(LegacyRecipe { bahan, cara }) => {
        let mut recipes = IndexMap::new();
        if !bahan.is_empty() || !cara.is_empty() {
          recipes.insert(
            LEGACY_RECIPE_TITLE.to_string(),
            Recipe {
              ingredients: bahan,
              steps: cara,
            },
          );
        }
        recipes
      }
    }
  }
}

/// 只读知识库，进程启动时构建一次，之后通过引用共享
#[derive(Debug, Clone, Default)]
pub struct Catalog {
  names: Vec<String>,
  info: IndexMap<String, CatalogEntry>,
}

impl FromUrlWithScheme for Catalog {
  const SCHEME: &'static str = "catalog";
}

impl FromUrl for Catalog {
  type Error = CatalogError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(CatalogError::SchemeMismatch(url.scheme().to_string()));
    }

    Catalog::load(url_file_path(url))
  }
}

impl Catalog {
  /// 从文件加载知识库，文件句柄在返回前释放
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
    let path = path.as_ref();
    info!("加载知识库文件: {}", path.display());
    let file = std::fs::File::open(path).map_err(|source| CatalogError::Open {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_reader(file)
  }

  pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
    let document: CatalogDocument = serde_yaml::from_reader(reader)?;
    Self::from_document(document)
  }

  pub fn from_yaml_str(source: &str) -> Result<Self, CatalogError> {
    let document: CatalogDocument = serde_yaml::from_str(source)?;
    Self::from_document(document)
  }

  fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
    let names = document.names.ok_or(CatalogError::MissingNames)?;

    let info: IndexMap<String, CatalogEntry> = document
      .info
      .unwrap_or_default()
      .into_iter()
      .map(|(name, entry)| {
        let entry = entry.unwrap_or_default();
        let catalog_entry = CatalogEntry {
          name: name.clone(),
          components: entry.components.unwrap_or_default(),
          benefits: entry.benefits.unwrap_or_default(),
          recipes: entry
            .recipes
            .map(RecipesDocument::into_recipes)
            .unwrap_or_default(),
          reference_image: entry.reference_image,
        };
        (name, catalog_entry)
      })
      .collect();

    for name in names.iter().filter(|name| !info.contains_key(*name)) {
      debug!("类别 {} 没有对应的资料", name);
    }

    info!("知识库加载完成: {} 个类别, {} 条资料", names.len(), info.len());
    Ok(Catalog { names, info })
  }

  /// 类别索引到名称的映射
  pub fn class_name_for(&self, class_id: i64) -> Result<&str, IndexOutOfRange> {
    usize::try_from(class_id)
      .ok()
      .and_then(|index| self.names.get(index))
      .map(String::as_str)
      .ok_or(IndexOutOfRange {
        class_id,
        len: self.names.len(),
      })
  }

  /// 名称对应的资料；没有资料时返回空条目
  pub fn entry_for(&self, name: &str) -> CatalogEntry {
    self
      .info
      .get(name)
      .cloned()
      .unwrap_or_else(|| CatalogEntry::empty(name))
  }

  pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
    self.info.get(name)
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  /// 按文件中的声明顺序遍历资料
  pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
    self.info.values()
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
