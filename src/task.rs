// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 任务定义
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

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::{thread, time::Duration};

use tracing::{info, warn};

use crate::output::Render;

mod session;
pub use self::session::{DEFAULT_STAGE_TIMEOUT, DetectionSession, SessionOptions};

pub trait Task<I, O>: Sized {
  type Error;
  fn run_task(self, input: I, session: &mut DetectionSession, output: &O) -> Result<(), Self::Error>;
}

/// 依次处理每个输入，每张图像等待结果后渲染
pub struct OneShotTask;

impl<I, O, RE> Task<I, O> for OneShotTask
where
  I: IntoIterator<Item = PathBuf>,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, session: &mut DetectionSession, output: &O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let mut failures = 0usize;
    let mut total = 0usize;
    for path in input {
      total += 1;
      let now = std::time::Instant::now();
      let state = session.run(path);
      info!("处理完成，耗时: {:.2?}", now.elapsed());
      if state.failure().is_some() {
        failures += 1;
      }
      output.render_view(state)?;
      session.dismiss();
    }

    if total == 0 {
      anyhow::bail!("没有输入图像");
    }
    if failures > 0 {
      anyhow::bail!("{} / {} 张图像处理失败", failures, total);
    }
    Ok(())
  }
}

/// 一条交互指令：选择新图像，或在失败后复位
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Select(PathBuf),
  Dismiss,
}

impl Command {
  /// 空行表示复位，其余为图像路径
  pub fn parse_line(line: &str) -> Self {
    let line = line.trim();
    if line.is_empty() {
      Command::Dismiss
    } else {
      Command::Select(PathBuf::from(line))
    }
  }
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 持续接收指令；新的选择会取代仍在进行中的选择
#[derive(Default, Debug)]
pub struct ContinuousTask {
  handle_interrupt: bool,
}

impl ContinuousTask {
  pub fn with_interrupt(mut self, handle_interrupt: bool) -> Self {
    self.handle_interrupt = handle_interrupt;
    self
  }
}

impl<I, O, RE> Task<I, O> for ContinuousTask
where
  I: IntoIterator<Item = Command>,
  I::IntoIter: Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, session: &mut DetectionSession, output: &O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (stop_tx, stop_rx) = mpsc::channel();
    if self.handle_interrupt {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = stop_tx.send(());
      })?;
    }

    let (command_tx, command_rx) = mpsc::channel();
    let commands = input.into_iter();
    thread::spawn(move || {
      for command in commands {
        if command_tx.send(command).is_err() {
          break;
        }
      }
    });

    let mut input_closed = false;
    let mut rendered_generation = 0;
    loop {
      if stop_rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      if !input_closed {
        match command_rx.recv_timeout(POLL_INTERVAL) {
          Ok(Command::Select(path)) => {
            session.select(path);
          }
          Ok(Command::Dismiss) => {
            if session.dismiss() {
              output.render_view(session.state())?;
            }
          }
          Err(RecvTimeoutError::Timeout) => {}
          Err(RecvTimeoutError::Disconnected) => input_closed = true,
        }
      } else {
        thread::sleep(POLL_INTERVAL);
      }

      session.pump();
      let state = session.state();
      if !state.is_loading() && state.generation() != rendered_generation {
        rendered_generation = state.generation();
        output.render_view(state)?;
      }

      if input_closed && !state.is_loading() {
        break;
      }
    }

    info!("任务完成，退出");
    Ok(())
  }
}
