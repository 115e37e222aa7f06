//! 会话驱动器 - 编排层
//!
//! 在单个 tokio 任务里用一个 `select!` 循环驱动 `ProctoredSession`：
//! 每秒倒计时、环境信号、用户命令、违规升级到期，四路输入互不并行
//!
//! 只做调度和日志，不做业务判断

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::infrastructure::EnvironmentSignalSource;
use crate::models::{
    EnvironmentSignal, QuestionKey, SessionPhase, SubmissionPayload, SubmitReason, ViolationEvent,
};
use crate::services::{format_hms, EscalationEffect, PaletteSummary, ViolationLog};
use crate::utils::logging::truncate_text;
use crate::workflow::ProctoredSession;

/// 用户命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start { consent: bool },
    /// 为当前题选择选项（0 起）
    Select(usize),
    Clear,
    ToggleReview,
    Next,
    Prev,
    GoTo(QuestionKey),
    GoToSubject(usize),
    Submit,
    /// 打印当前题和题号面板
    Status,
}

/// 会话结束后的汇总
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub exam_id: String,
    pub phase: SessionPhase,
    pub reason: Option<SubmitReason>,
    pub payload: Option<SubmissionPayload>,
    /// 交卷数据是否已进入发件箱
    pub handed_off: bool,
    pub violations: Vec<ViolationEvent>,
    pub palette: PaletteSummary,
}

/// 会话驱动器
pub struct SessionRunner<S: EnvironmentSignalSource> {
    session: ProctoredSession,
    signals: S,
    commands: mpsc::Receiver<SessionCommand>,
    violation_log: Option<ViolationLog>,
    payload: Option<SubmissionPayload>,
}

impl<S: EnvironmentSignalSource> SessionRunner<S> {
    pub fn new(session: ProctoredSession, signals: S, commands: mpsc::Receiver<SessionCommand>) -> Self {
        Self {
            session,
            signals,
            commands,
            violation_log: None,
            payload: None,
        }
    }

    /// 把违规事件同时写入审计日志
    pub fn with_violation_log(mut self, log: ViolationLog) -> Self {
        self.violation_log = Some(log);
        self
    }

    fn label(&self) -> &str {
        &self.session.exam().id
    }

    /// 运行到会话结束，或所有输入都已关闭且没有待处理的计时
    pub async fn run(mut self) -> AppResult<SessionReport> {
        let second = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + second, second);
        let mut signals_open = true;
        let mut commands_open = true;

        info!("[场次 {}] 等待考生同意考试须知", self.label());

        while !self.session.phase().is_final() {
            let active = self.session.phase() == SessionPhase::Active;
            let escalation = self.session.escalation_remaining();

            tokio::select! {
                _ = ticker.tick(), if active => {
                    if let Some(payload) = self.session.tick_second() {
                        self.payload = Some(payload);
                    }
                }
                _ = sleep(escalation.unwrap_or_default()), if escalation.is_some() => {
                    if let Some(payload) = self.session.poll_escalation() {
                        self.payload = Some(payload);
                    }
                }
                signal = self.signals.next_signal(), if signals_open => match signal {
                    Some(signal) => self.on_signal(signal).await,
                    None => {
                        debug!("[场次 {}] 环境信号来源已关闭", self.label());
                        signals_open = false;
                    }
                },
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => {
                        let was_active = active;
                        self.on_command(command);
                        if !was_active && self.session.phase() == SessionPhase::Active {
                            // 倒计时从开考时刻算起
                            ticker.reset();
                        }
                    }
                    None => {
                        debug!("[场次 {}] 命令通道已关闭", self.label());
                        commands_open = false;
                    }
                },
                else => {
                    warn!("[场次 {}] 所有输入都已关闭，会话未结束即退出", self.label());
                    break;
                }
            }
        }

        Ok(self.into_report())
    }

    async fn on_signal(&mut self, signal: EnvironmentSignal) {
        let outcome = self.session.handle_signal(&signal);

        if outcome.suppress {
            debug!("[场次 {}] 已拦截受限按键", self.label());
        }
        match outcome.effect {
            EscalationEffect::Started { recoverable, .. } => {
                if let Some(left) = self.session.escalation_remaining() {
                    warn!(
                        "[场次 {}] 🚨 违规升级开始，{:.1} 秒后判定{}",
                        self.label(),
                        left.as_secs_f64(),
                        if recoverable { "（恢复可撤销）" } else { "" }
                    );
                }
            }
            EscalationEffect::Cancelled => {
                info!("[场次 {}] ✓ 违规已恢复，升级撤销", self.label());
            }
            EscalationEffect::Unchanged => {}
        }

        if let (Some(event), Some(log)) = (&outcome.violation, &self.violation_log) {
            if let Err(e) = log.append(event).await {
                warn!("[场次 {}] 违规记录写入失败: {}", self.label(), e);
            }
        }
    }

    fn on_command(&mut self, command: SessionCommand) {
        let result = match command.clone() {
            SessionCommand::Start { consent } => self.session.start(consent).map(|_| self.describe_current()),
            SessionCommand::Select(option) => self.session.select_option(option).map(|_| {
                info!("[场次 {}] ✓ 已作答 {}", self.label(), self.session.current());
            }),
            SessionCommand::Clear => self.session.clear_response().map(|previous| {
                if previous.is_some() {
                    info!("[场次 {}] 已清除 {} 的作答", self.label(), self.session.current());
                }
            }),
            SessionCommand::ToggleReview => self.session.toggle_review().map(|marked| {
                info!(
                    "[场次 {}] {} {}",
                    self.label(),
                    self.session.current(),
                    if marked { "已标记复查" } else { "已取消复查标记" }
                );
            }),
            SessionCommand::Next => self.session.next().map(|moved| self.after_move(moved)),
            SessionCommand::Prev => self.session.prev().map(|moved| self.after_move(moved)),
            SessionCommand::GoTo(key) => self.session.go_to(key).map(|k| self.after_move(Some(k))),
            SessionCommand::GoToSubject(subject) => self
                .session
                .go_to_subject(subject)
                .map(|k| self.after_move(Some(k))),
            SessionCommand::Submit => self.session.submit().map(|payload| {
                self.payload = Some(payload);
            }),
            SessionCommand::Status => {
                self.describe_current();
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("[场次 {}] ⚠️ 命令 {:?} 未执行: {}", self.label(), command, e);
        }
    }

    fn after_move(&self, moved: Option<QuestionKey>) {
        match moved {
            Some(_) => self.describe_current(),
            None => info!("[场次 {}] 已经是边界题目", self.label()),
        }
    }

    fn describe_current(&self) {
        let key = self.session.current();
        let Some(question) = self.session.current_question() else {
            return;
        };
        let subject = self
            .session
            .exam()
            .subjects
            .get(key.subject)
            .map(|s| s.name.as_str())
            .unwrap_or_default();

        info!(
            "[场次 {}] 📝 {} 第 {} 题 | 剩余 {} | {}",
            self.label(),
            subject,
            key.question + 1,
            format_hms(self.session.time_left()),
            truncate_text(&question.text, 60)
        );
        for (index, option) in question.options.iter().enumerate() {
            let marker = if self.session.answers().answer(key) == Some(index) {
                "●"
            } else {
                "○"
            };
            info!("    {} {}. {}", marker, index + 1, truncate_text(option, 60));
        }

        let palette = self.session.palette();
        info!(
            "    已答 {} | 未答 {} | 复查 {} | 未访问 {}",
            palette.answered, palette.not_answered, palette.review, palette.not_visited
        );
    }

    fn into_report(self) -> SessionReport {
        SessionReport {
            exam_id: self.session.exam().id.clone(),
            phase: self.session.phase(),
            reason: self.session.submitted_reason(),
            payload: self.payload,
            handed_off: self.session.submission_handed_off(),
            violations: self.session.violations().to_vec(),
            palette: self.session.palette(),
        }
    }
}
