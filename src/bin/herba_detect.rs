// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/bin/herba_detect.rs - 叶片识别程序
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

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use url::Url;

use herbasmart::{
  FromUrl,
  catalog::Catalog,
  detection::{AssembleOptions, Recognizer},
  input::InputWrapper,
  model::RecordProvider,
  output::OutputWrapper,
  task::{ContinuousTask, OneShotTask, Task},
};
use tracing::info;

/// HerbaSmart 叶片识别参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 知识库文件，例如 catalog:///data/data-baru.yaml
  #[arg(long, value_name = "CATALOG")]
  pub catalog: Url,
  /// 输入来源：image:///leaf.jpg 或 folder:///frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 检测结果提供者：record: 或 record:///records
  #[arg(long, value_name = "PROVIDER", default_value = "record:")]
  pub provider: Url,
  /// 输出：console:、json:///out.jsonl、image:///out.png 或 folder:///out
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,
  /// 同名叶片只保留第一个检测结果
  #[arg(long)]
  pub dedupe: bool,
  /// 逐帧处理全部输入，而不是只处理第一帧
  #[arg(long)]
  pub continuous: bool,
  /// 连续模式下最多处理的帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("知识库: {}", args.catalog);
  info!("输入来源: {}", args.input);
  info!("检测结果提供者: {}", args.provider);
  info!("输出路径: {}", args.output);

  let catalog = Arc::new(Catalog::from_url(&args.catalog)?);
  let input = InputWrapper::from_url(&args.input)?;
  let provider = RecordProvider::from_url(&args.provider)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let recognizer = Recognizer::new(provider, catalog).with_options(AssembleOptions {
    dedupe: args.dedupe,
  });

  if args.continuous {
    ContinuousTask::default()
      .with_frame_number(args.frame_number)
      .with_interrupt_handler()
      .run_task(input, recognizer, output)?;
  } else {
    OneShotTask.run_task(input, recognizer, output)?;
  }

  Ok(())
}
