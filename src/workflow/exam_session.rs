//! 单场考试会话 - 流程层
//!
//! 串联作答、导航、倒计时、环境监控和交卷：
//! consent ──start──▶ active ──(manual | time_up)──▶ completed
//!                      └──────(expelled)──────────▶ terminated
//!
//! 三种交卷触发（手动、到时、逐出）都汇聚到 `finalize`，先到者生效

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, SessionError};
use crate::infrastructure::{Clock, EnvironmentControl};
use crate::models::{
    DeviceClass, EnvironmentSignal, ExamDefinition, Question, QuestionKey, SessionPhase,
    SubmissionPayload, SubmitReason, ViolationEvent,
};
use crate::services::{
    AnswerState, ClockTick, EscalationEffect, FinalizeContext, IntegrityMonitor, MonitorState,
    NavigationController, PaletteSummary, PolicyTable, QuestionStatus, RestrictedKeys,
    SessionClock, SignalOutcome, SubmissionController, SubmissionOutbox,
};

/// 会话启动参数
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub device_class: DeviceClass,
    pub policies: PolicyTable,
    pub restricted_keys: RestrictedKeys,
}

/// 一场监考考试
pub struct ProctoredSession {
    exam: Arc<ExamDefinition>,
    device_class: DeviceClass,
    phase: SessionPhase,
    clock: SessionClock,
    monitor: IntegrityMonitor,
    answers: AnswerState,
    navigation: NavigationController,
    submission: SubmissionController,
    environment: Box<dyn EnvironmentControl>,
    time_source: Arc<dyn Clock>,
}

impl ProctoredSession {
    /// 创建会话（停在 consent 阶段）
    pub fn new(
        exam: Arc<ExamDefinition>,
        settings: SessionSettings,
        outbox: SubmissionOutbox,
        environment: Box<dyn EnvironmentControl>,
        time_source: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        exam.validate()?;

        let policy = settings.policies.policy_for(settings.device_class);
        Ok(Self {
            device_class: settings.device_class,
            phase: SessionPhase::Consent,
            clock: SessionClock::new(exam.duration_minutes),
            monitor: IntegrityMonitor::new(settings.device_class, policy, settings.restricted_keys),
            answers: AnswerState::new(exam.clone()),
            navigation: NavigationController::new(exam.clone()),
            submission: SubmissionController::new(outbox),
            environment,
            time_source,
            exam,
        })
    }

    // ========== 只读访问 ==========

    pub fn exam(&self) -> &ExamDefinition {
        &self.exam
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    pub fn current(&self) -> QuestionKey {
        self.navigation.current()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.exam.question(self.navigation.current())
    }

    pub fn is_first(&self) -> bool {
        self.navigation.is_first()
    }

    pub fn is_last(&self) -> bool {
        self.navigation.is_last()
    }

    pub fn answers(&self) -> &AnswerState {
        &self.answers
    }

    pub fn time_left(&self) -> u64 {
        self.clock.time_left()
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.monitor.state()
    }

    pub fn violations(&self) -> &[ViolationEvent] {
        self.monitor.violations()
    }

    pub fn submitted_reason(&self) -> Option<SubmitReason> {
        self.submission.submitted_reason()
    }

    pub fn submission_handed_off(&self) -> bool {
        self.submission.is_handed_off()
    }

    pub fn status_of(&self, key: QuestionKey) -> QuestionStatus {
        self.answers.status_of(key, self.navigation.current())
    }

    /// 某个科目全部题目的面板状态
    pub fn subject_statuses(&self, subject: usize) -> Vec<QuestionStatus> {
        let count = self.exam.question_count(subject).unwrap_or(0);
        (0..count)
            .map(|q| self.status_of(QuestionKey::new(subject, q)))
            .collect()
    }

    pub fn palette(&self) -> PaletteSummary {
        self.answers.summary()
    }

    // ========== 阶段切换 ==========

    /// 同意考试须知后开始考试
    pub fn start(&mut self, consent: bool) -> AppResult<()> {
        if self.phase != SessionPhase::Consent {
            return Err(AppError::wrong_phase(self.phase, "start"));
        }
        if !consent {
            return Err(SessionError::ConsentRequired.into());
        }

        self.phase = SessionPhase::Active;
        self.answers.unlock();
        self.answers.mark_visited(self.navigation.current())?;
        self.clock.start();
        self.monitor.arm();
        self.environment.request_fullscreen();

        info!(
            "[场次 {}] ▶️ 考试开始: {} | {} 题 | {} 分钟 | 设备 {}",
            self.exam.id,
            self.exam.title,
            self.exam.total_questions(),
            self.exam.duration_minutes,
            self.device_class
        );
        Ok(())
    }

    // ========== 作答 ==========

    /// 为当前题选择选项
    pub fn select_option(&mut self, option: usize) -> AppResult<()> {
        self.set_answer(self.navigation.current(), option)
    }

    pub fn set_answer(&mut self, key: QuestionKey, option: usize) -> AppResult<()> {
        self.answers.set_answer(key, option)?;
        debug!("[场次 {}] 作答 {} → {}", self.exam.id, key, option);
        Ok(())
    }

    /// 清除当前题的作答
    pub fn clear_response(&mut self) -> AppResult<Option<usize>> {
        self.answers.clear_answer(self.navigation.current())
    }

    /// 切换当前题的复查标记
    pub fn toggle_review(&mut self) -> AppResult<bool> {
        self.answers.toggle_review(self.navigation.current())
    }

    // ========== 导航 ==========

    pub fn next(&mut self) -> AppResult<Option<QuestionKey>> {
        self.navigation.next(&mut self.answers)
    }

    pub fn prev(&mut self) -> AppResult<Option<QuestionKey>> {
        self.navigation.prev(&mut self.answers)
    }

    pub fn go_to(&mut self, key: QuestionKey) -> AppResult<QuestionKey> {
        self.navigation.go_to(key, &mut self.answers)
    }

    pub fn go_to_subject(&mut self, subject: usize) -> AppResult<QuestionKey> {
        self.navigation.go_to_subject(subject, &mut self.answers)
    }

    // ========== 环境监控与计时 ==========

    /// 处理一条环境信号
    ///
    /// 逐出在 `poll_escalation` 中判定，这里只登记违规和开始升级
    pub fn handle_signal(&mut self, signal: &EnvironmentSignal) -> SignalOutcome {
        if self.phase != SessionPhase::Active {
            return SignalOutcome {
                violation: None,
                suppress: false,
                effect: EscalationEffect::Unchanged,
            };
        }
        self.monitor.handle_signal(
            signal,
            self.time_source.elapsed(),
            self.time_source.wall_now(),
        )
    }

    /// 检查升级是否到期，到期则以 expelled 交卷
    pub fn poll_escalation(&mut self) -> Option<SubmissionPayload> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let trigger = self.monitor.poll(self.time_source.elapsed())?;
        warn!("[场次 {}] ⛔ 因 {} 被逐出考试", self.exam.id, trigger);
        self.finalize(SubmitReason::Expelled)
    }

    /// 距离升级到期的剩余时间
    pub fn escalation_remaining(&self) -> Option<Duration> {
        self.monitor
            .deadline()
            .map(|deadline| deadline.saturating_sub(self.time_source.elapsed()))
    }

    /// 推进一秒；计到零时以 time_up 交卷
    pub fn tick_second(&mut self) -> Option<SubmissionPayload> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        match self.clock.tick() {
            ClockTick::Expired => {
                info!("[场次 {}] ⏰ 考试时间到", self.exam.id);
                self.finalize(SubmitReason::TimeUp)
            }
            ClockTick::Running(left) => {
                if left % 60 == 0 {
                    debug!("[场次 {}] 剩余 {} 分钟", self.exam.id, left / 60);
                }
                None
            }
            ClockTick::Idle => None,
        }
    }

    // ========== 交卷 ==========

    /// 考生手动交卷
    pub fn submit(&mut self) -> AppResult<SubmissionPayload> {
        let phase = self.phase;
        self.finalize(SubmitReason::Manual)
            .ok_or_else(|| AppError::wrong_phase(phase, "submit"))
    }

    /// 结束会话并交出交卷数据
    ///
    /// 只有 active 阶段的第一次调用生效；交卷数据先交给发件箱，再释放全屏和摄像头
    pub fn finalize(&mut self, reason: SubmitReason) -> Option<SubmissionPayload> {
        if self.phase != SessionPhase::Active {
            debug!(
                "[场次 {}] 阶段 {} 下忽略 {} 交卷请求",
                self.exam.id, self.phase, reason
            );
            return None;
        }

        let ctx = FinalizeContext {
            exam_id: self.exam.id.clone(),
            total_secs: self.clock.total_secs(),
            time_left: self.clock.time_left(),
            device_class: self.device_class,
            timestamp: self.time_source.wall_now(),
        };
        let payload = self.submission.finalize(reason, &mut self.answers, ctx)?;

        self.environment.exit_fullscreen();
        self.environment.release_camera();
        self.monitor.release();
        self.clock.halt();
        self.phase = reason.final_phase();

        info!(
            "[场次 {}] 🏁 会话结束: 阶段 {} | 原因 {}",
            self.exam.id, self.phase, reason
        );
        Some(payload)
    }
}
