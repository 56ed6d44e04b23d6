// 该文件是 HerbaSmart （草木识） 项目的一部分。
// tests/pipeline.rs - 端到端识别流程测试
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

use std::{fs, path::Path, sync::Arc};

use herbasmart::{
  FromUrl,
  catalog::{Catalog, CatalogError},
  detection::{AssembleOptions, Recognizer},
  input::{DirectoryInput, ImageFileInput, InputWrapper},
  model::{RecordProvider, parse_records},
  output::{DirectoryRecordOutput, DrawWrapper, JsonOutput, OutputWrapper},
  task::{ContinuousTask, OneShotTask, Task},
};
use image::RgbImage;
use serde_json::Value;
use tempfile::TempDir;
use url::Url;

const CATALOG: &str = r#"
names:
  - Sirih
  - Jahe
info:
  Sirih:
    components: [Kavikol, Eugenol]
    benefits: [Mengobati batuk, Antiseptik]
    recipes:
      Obat batuk:
        ingredients: [5 lembar daun sirih, 2 gelas air]
        steps: [Rebus daun sirih, Minum selagi hangat]
    gambar: assets/sirih.jpg
  Jahe:
    benefits: [Menghangatkan tubuh]
"#;

fn write_image(path: &Path) {
  RgbImage::new(32, 32).save(path).unwrap();
}

fn read_lines(path: &Path) -> Vec<Value> {
  fs::read_to_string(path)
    .unwrap()
    .lines()
    .map(|line| serde_json::from_str(line).unwrap())
    .collect()
}

fn file_url(scheme: &str, path: &Path) -> Url {
  let mut url = Url::parse(&format!("{}:///", scheme)).unwrap();
  url.set_path(&path.display().to_string());
  url
}

#[test]
fn catalog_url_with_spaces_is_decoded() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("data baru.yaml");
  fs::write(&path, CATALOG).unwrap();

  let url = file_url("catalog", &path);
  assert!(url.as_str().contains("%20"));

  let catalog = Catalog::from_url(&url).unwrap();
  assert_eq!(catalog.names(), ["Sirih", "Jahe"]);
}

#[test]
fn missing_catalog_file_fails_to_load() {
  let dir = TempDir::new().unwrap();
  let result = Catalog::load(dir.path().join("missing.yaml"));
  assert!(matches!(result, Err(CatalogError::Open { .. })));
}

#[test]
fn one_shot_with_sidecar_records_writes_json() {
  let dir = TempDir::new().unwrap();
  let catalog_path = dir.path().join("data.yaml");
  fs::write(&catalog_path, CATALOG).unwrap();
  let image_path = dir.path().join("leaf.png");
  write_image(&image_path);
  fs::write(
    dir.path().join("leaf.txt"),
    "0, 0.8734, 1, 2, 10, 12\n5, 0.80, 5, 6, 7, 8\n0, 0.50, 3, 3, 9, 9\n",
  )
  .unwrap();

  let catalog = Arc::new(Catalog::load(&catalog_path).unwrap());
  let input = ImageFileInput::open(&image_path).unwrap();
  let output_path = dir.path().join("out/result.jsonl");
  let output = JsonOutput::create(&output_path).unwrap();
  let recognizer = Recognizer::new(RecordProvider::sidecar(), catalog);

  OneShotTask.run_task(input, recognizer, output).unwrap();

  let lines = read_lines(&output_path);
  assert_eq!(lines.len(), 1);
  let detections = lines[0]["detections"].as_array().unwrap();
  assert_eq!(detections.len(), 2);
  assert_eq!(detections[0]["name"], "Sirih");
  assert_eq!(detections[0]["confidence_percent"], 87.34);
  assert_eq!(detections[0]["components"][1], "Eugenol");
  assert_eq!(
    detections[0]["recipes"]["Obat batuk"]["steps"][0],
    "Rebus daun sirih"
  );
  assert_eq!(detections[0]["reference_image"], "assets/sirih.jpg");
  assert_eq!(detections[1]["confidence_percent"], 50.0);
}

#[test]
fn continuous_over_folder_with_dedupe() {
  let dir = TempDir::new().unwrap();
  let frames = dir.path().join("frames");
  let records = dir.path().join("records");
  fs::create_dir_all(&frames).unwrap();
  fs::create_dir_all(&records).unwrap();

  write_image(&frames.join("001.png"));
  write_image(&frames.join("002.png"));
  write_image(&frames.join("003.png"));
  fs::write(frames.join("notes.md"), "not an image").unwrap();
  fs::write(records.join("001.txt"), "1, 0.9, 0, 0, 5, 5\n1, 0.7, 1, 1, 6, 6\n").unwrap();
  fs::write(records.join("003.txt"), "# nothing but a comment\n").unwrap();

  let catalog = Arc::new(Catalog::from_yaml_str(CATALOG).unwrap());
  let input = InputWrapper::from_url(&file_url("folder", &frames)).unwrap();
  let provider = RecordProvider::from_url(&file_url("record", &records)).unwrap();
  let output_path = dir.path().join("result.jsonl");
  let output = OutputWrapper::from_url(&file_url("json", &output_path)).unwrap();
  let recognizer =
    Recognizer::new(provider, catalog).with_options(AssembleOptions { dedupe: true });

  ContinuousTask::default()
    .run_task(input, recognizer, output)
    .unwrap();

  let lines = read_lines(&output_path);
  assert_eq!(lines.len(), 3);
  assert_eq!(lines[0]["frame"], 0);
  let first = lines[0]["detections"].as_array().unwrap();
  assert_eq!(first.len(), 1);
  assert_eq!(first[0]["name"], "Jahe");
  assert_eq!(first[0]["confidence_percent"], 90.0);
  assert!(lines[1]["detections"].as_array().unwrap().is_empty());
  assert!(lines[2]["detections"].as_array().unwrap().is_empty());
}

#[test]
fn folder_record_output_can_be_replayed() {
  let dir = TempDir::new().unwrap();
  let image_path = dir.path().join("leaf.png");
  write_image(&image_path);
  let original = "0, 0.91, 1, 2, 3, 4\n9, 0.4, 0, 0, 1, 1\n";
  fs::write(dir.path().join("leaf.txt"), original).unwrap();

  let catalog = Arc::new(Catalog::from_yaml_str(CATALOG).unwrap());
  let saved = dir.path().join("saved");
  let output = DirectoryRecordOutput::new(&saved, DrawWrapper::Record, false);
  let recognizer = Recognizer::new(RecordProvider::sidecar(), catalog.clone());
  OneShotTask
    .run_task(ImageFileInput::open(&image_path).unwrap(), recognizer, output)
    .unwrap();

  // 年/月/日 目录下应当有一张图片和一份记录
  let mut day_dir = saved.clone();
  for _ in 0..3 {
    let next = fs::read_dir(&day_dir).unwrap().next().unwrap().unwrap().path();
    day_dir = next;
  }
  let saved_frame = DirectoryInput::open(&day_dir).unwrap().next().unwrap();
  let saved_record =
    fs::read_to_string(saved_frame.source().unwrap().with_extension("txt")).unwrap();
  assert_eq!(
    parse_records(&saved_record).unwrap(),
    parse_records(original).unwrap()
  );

  let json_path = dir.path().join("replay.jsonl");
  let recognizer = Recognizer::new(RecordProvider::sidecar(), catalog);
  OneShotTask
    .run_task(
      std::iter::once(saved_frame),
      recognizer,
      JsonOutput::create(&json_path).unwrap(),
    )
    .unwrap();

  let lines = read_lines(&json_path);
  assert_eq!(lines[0]["detections"][0]["name"], "Sirih");
  assert_eq!(lines[0]["detections"][0]["confidence_percent"], 91.0);
  assert_eq!(lines[0]["detections"].as_array().unwrap().len(), 1);
}
