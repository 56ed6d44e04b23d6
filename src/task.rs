// 该文件是 HerbaSmart （草木识） 项目的一部分。
// src/task.rs - 识别任务
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

use std::{thread, time::Duration};
use tracing::{info, warn};

use crate::{
  detection::{DetectionResult, Recognizer},
  model::DetectionProvider,
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, recognizer: Recognizer<M>, output: O) -> Result<(), Self::Error>;
}

/// 只处理输入的第一帧
pub struct OneShotTask;

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: DetectionProvider<Input = F, Error = ME>,
  O: Render<F, DetectionResult, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, recognizer: Recognizer<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始识别...");
    let result = recognizer.recognize(&frame)?;
    info!(
      "识别完成，检测到 {} 片叶子，耗时: {:.2?}",
      result.len(),
      result.elapsed
    );
    output.render_result(&frame, &result)?;
    info!("渲染完成");

    Ok(())
  }
}

/// 逐帧处理直到输入结束、达到指定帧数或收到中断信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  handle_interrupt: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理器；每个进程只能安装一次
  pub fn with_interrupt_handler(mut self) -> Self {
    self.handle_interrupt = true;
    self
  }
}

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: DetectionProvider<Input = F, Error = ME>,
  O: Render<F, DetectionResult, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, recognizer: Recognizer<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    if self.handle_interrupt {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }

    let mut frame_count = 0usize;
    let mut total_detections = 0usize;
    for frame in input {
      frame_count += 1;
      info!("处理第 {} 帧图像", frame_count);
      let result = recognizer.recognize(&frame)?;
      total_detections += result.len();
      output.render_result(&frame, &result)?;
      info!(
        "识别完成，检测到 {} 片叶子，耗时: {:.2?}",
        result.len(),
        result.elapsed
      );
      if self.frame_number.map(|n| frame_count >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_count);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 帧，检测到 {} 片叶子",
      frame_count, total_detections
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{catalog::Catalog, model::RawDetection};
  use std::{cell::RefCell, sync::Arc};

  struct ByIndex;

  impl DetectionProvider for ByIndex {
    type Input = i64;
    type Error = std::convert::Infallible;

    fn detect(&self, input: &i64) -> Result<Vec<RawDetection>, Self::Error> {
      Ok(vec![RawDetection::new(*input, 0.5, [0.0; 4])])
    }
  }

  #[derive(Default)]
  struct Collect(RefCell<Vec<(i64, usize)>>);

  impl Render<i64, DetectionResult> for &Collect {
    type Error = std::convert::Infallible;

    fn render_result(&self, frame: &i64, result: &DetectionResult) -> Result<(), Self::Error> {
      self.0.borrow_mut().push((*frame, result.len()));
      Ok(())
    }
  }

  fn recognizer() -> Recognizer<ByIndex> {
    let catalog = Catalog::from_yaml_str("names: [Sirih, Jahe]\n").unwrap();
    Recognizer::new(ByIndex, Arc::new(catalog))
  }

  #[test]
  fn one_shot_renders_first_frame_only() {
    let collect = Collect::default();
    OneShotTask
      .run_task(vec![1i64, 0, 1].into_iter(), recognizer(), &collect)
      .unwrap();
    assert_eq!(collect.0.into_inner(), vec![(1, 1)]);
  }

  #[test]
  fn one_shot_fails_without_frames() {
    let collect = Collect::default();
    let result = OneShotTask.run_task(Vec::<i64>::new().into_iter(), recognizer(), &collect);
    assert!(result.is_err());
  }

  #[test]
  fn continuous_stops_at_frame_number() {
    let collect = Collect::default();
    ContinuousTask::default()
      .with_frame_number(Some(3))
      .run_task(vec![0i64, 7, 1, 0, 1].into_iter(), recognizer(), &collect)
      .unwrap();
    // 类别 7 越界, 该帧结果为空
    assert_eq!(collect.0.into_inner(), vec![(0, 1), (7, 0), (1, 1)]);
  }
}
