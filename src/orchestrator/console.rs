//! 命令行输入 - 编排层
//!
//! 把标准输入的每一行解析成 `SessionCommand` 或环境信号。
//! 面向人的编号（选项、科目、题号）都从 1 开始，选项也可以写字母

use std::io::BufRead;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::{EnvironmentSignal, KeyChord, QuestionKey};
use crate::orchestrator::session_runner::SessionCommand;

/// 一行输入的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(SessionCommand),
    Signal(EnvironmentSignal),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleParseError {
    #[error("空命令")]
    Empty,
    #[error("未知命令: {0}")]
    Unknown(String),
    #[error("命令 {command} 的参数无效: '{argument}'")]
    BadArgument { command: String, argument: String },
}

pub const HELP: &str = "\
命令: start | answer <1-n 或 A-Z> | clear | review | next | prev | goto <科目> <题号> |
      subject <科目> | status | submit | quit
模拟环境: signal fullscreen-lost | fullscreen-restored | hidden | visible | key <按键组合>";

fn bad(command: &str, argument: &str) -> ConsoleParseError {
    ConsoleParseError::BadArgument {
        command: command.to_string(),
        argument: argument.to_string(),
    }
}

/// 从 1 开始的编号转成下标
fn one_based(command: &str, argument: Option<&str>) -> Result<usize, ConsoleParseError> {
    let raw = argument.unwrap_or_default();
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| bad(command, raw))
}

/// 选项：数字从 1 开始，或单个字母 A-Z
fn option_index(argument: Option<&str>) -> Result<usize, ConsoleParseError> {
    let raw = argument.unwrap_or_default();
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Ok((c.to_ascii_uppercase() as u8 - b'A') as usize)
        }
        _ => one_based("answer", Some(raw)),
    }
}

pub fn parse_line(line: &str) -> Result<ConsoleInput, ConsoleParseError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err(ConsoleParseError::Empty);
    };
    let command = command.to_ascii_lowercase();
    let first = words.next();

    let input = match command.as_str() {
        "start" => ConsoleInput::Command(SessionCommand::Start { consent: true }),
        "answer" | "a" => ConsoleInput::Command(SessionCommand::Select(option_index(first)?)),
        "clear" => ConsoleInput::Command(SessionCommand::Clear),
        "review" => ConsoleInput::Command(SessionCommand::ToggleReview),
        "next" | "n" => ConsoleInput::Command(SessionCommand::Next),
        "prev" | "p" => ConsoleInput::Command(SessionCommand::Prev),
        "goto" => {
            let subject = one_based("goto", first)?;
            let question = one_based("goto", words.next())?;
            ConsoleInput::Command(SessionCommand::GoTo(QuestionKey::new(subject, question)))
        }
        "subject" => ConsoleInput::Command(SessionCommand::GoToSubject(one_based("subject", first)?)),
        "status" => ConsoleInput::Command(SessionCommand::Status),
        "submit" => ConsoleInput::Command(SessionCommand::Submit),
        "signal" => {
            let name = first.unwrap_or_default();
            let signal = match name.to_ascii_lowercase().as_str() {
                "fullscreen-lost" => EnvironmentSignal::FullscreenLost,
                "fullscreen-restored" => EnvironmentSignal::FullscreenRestored,
                "hidden" => EnvironmentSignal::PageHidden,
                "visible" => EnvironmentSignal::PageVisible,
                _ => return Err(bad("signal", name)),
            };
            ConsoleInput::Signal(signal)
        }
        "key" => {
            let raw = first.unwrap_or_default();
            let chord: KeyChord = raw.parse().map_err(|_| bad("key", raw))?;
            ConsoleInput::Signal(EnvironmentSignal::KeyPressed(chord))
        }
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        other => return Err(ConsoleParseError::Unknown(other.to_string())),
    };
    Ok(input)
}

/// 在独立线程读取标准输入
///
/// 输入结束（EOF 或 quit）时发送一次交卷命令后退出
pub fn spawn_stdin_reader(
    commands: mpsc::Sender<SessionCommand>,
    signals: mpsc::UnboundedSender<EnvironmentSignal>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        info!("{}", HELP);
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let delivered = match parse_line(&line) {
                Ok(ConsoleInput::Command(command)) => commands.blocking_send(command).is_ok(),
                Ok(ConsoleInput::Signal(signal)) => signals.send(signal).is_ok(),
                Ok(ConsoleInput::Help) => {
                    info!("{}", HELP);
                    true
                }
                Ok(ConsoleInput::Quit) => break,
                Err(ConsoleParseError::Empty) => true,
                Err(e) => {
                    warn!("⚠️ {}（输入 help 查看命令）", e);
                    true
                }
            };
            if !delivered {
                debug!("会话已结束，停止读取输入");
                return;
            }
        }
        let _ = commands.blocking_send(SessionCommand::Submit);
    })
}
