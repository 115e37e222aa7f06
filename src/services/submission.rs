//! 交卷控制 - 业务能力层
//!
//! 一场考试只会产生一份交卷数据：第一次 `finalize` 生效，之后的调用全部忽略

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::models::{DeviceClass, SubmissionPayload, SubmitReason};
use crate::services::answer_state::AnswerState;

/// 交卷发件箱
///
/// 同步交接：`finalize` 把数据放进队列后立即返回，由调度任务负责投递和重试
#[derive(Debug, Clone)]
pub struct SubmissionOutbox {
    tx: mpsc::UnboundedSender<SubmissionPayload>,
}

impl SubmissionOutbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SubmissionPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 交出交卷数据；接收端已关闭时返回 false
    pub fn deliver(&self, payload: SubmissionPayload) -> bool {
        match self.tx.send(payload) {
            Ok(()) => true,
            Err(e) => {
                error!("❌ 交卷队列已关闭，考试 {} 的交卷数据未能交出", e.0.exam_id);
                false
            }
        }
    }
}

/// 交卷时的计时与身份信息
#[derive(Debug, Clone)]
pub struct FinalizeContext {
    pub exam_id: String,
    pub total_secs: u64,
    pub time_left: u64,
    pub device_class: DeviceClass,
    pub timestamp: DateTime<Utc>,
}

/// 交卷控制器
#[derive(Debug)]
pub struct SubmissionController {
    outbox: SubmissionOutbox,
    submitted: Option<SubmitReason>,
    handed_off: bool,
}

impl SubmissionController {
    pub fn new(outbox: SubmissionOutbox) -> Self {
        Self {
            outbox,
            submitted: None,
            handed_off: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.submitted.is_some()
    }

    pub fn submitted_reason(&self) -> Option<SubmitReason> {
        self.submitted
    }

    /// 交卷数据是否已放进发件箱
    pub fn is_handed_off(&self) -> bool {
        self.handed_off
    }

    /// 冻结作答、组装并交出交卷数据
    ///
    /// 只有第一次调用返回 Some
    pub fn finalize(
        &mut self,
        reason: SubmitReason,
        answers: &mut AnswerState,
        ctx: FinalizeContext,
    ) -> Option<SubmissionPayload> {
        if let Some(first) = self.submitted {
            info!("交卷已完成 (原因: {})，忽略重复的 {} 请求", first, reason);
            return None;
        }
        self.submitted = Some(reason);
        answers.freeze(reason.final_phase());

        let payload = SubmissionPayload {
            exam_id: ctx.exam_id,
            answers: answers.records(),
            answered_count: answers.answered_count(),
            time_spent: ctx.total_secs.saturating_sub(ctx.time_left),
            reason,
            device_class: ctx.device_class,
            timestamp: ctx.timestamp,
        };

        info!(
            "📤 交卷: 原因 {} | 已答 {} 题 | 用时 {} 秒",
            reason, payload.answered_count, payload.time_spent
        );
        self.handed_off = self.outbox.deliver(payload.clone());

        Some(payload)
    }
}
