//! 考试环境监控 - 业务能力层
//!
//! 把环境信号归类为违规事件，按设备策略升级，必要时判定逐出
//!
//! ```text
//! Idle ──arm──▶ Armed ──违规──▶ Warning / PendingTermination ──到期──▶ Terminated
//!                 ▲                 │
//!                 └──── 恢复（仅可恢复策略）
//! ```

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{DeviceClass, EnvironmentSignal, ViolationEvent, ViolationKind};
use crate::services::escalation_policy::EscalationPolicy;
use crate::services::restricted_keys::RestrictedKeys;

/// 监控状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// 尚未开始监控
    Idle,
    Armed,
    /// 可恢复的警告，宽限期截止于 `deadline`
    Warning {
        trigger: ViolationKind,
        deadline: Duration,
    },
    /// 不可恢复，到 `deadline` 即逐出
    PendingTermination {
        trigger: ViolationKind,
        deadline: Duration,
    },
    /// 已逐出（终态）
    Terminated,
    /// 会话以其他方式结束，监控撤销（终态）
    Released,
}

/// 一条信号对升级状态的影响
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationEffect {
    Unchanged,
    /// 开始升级
    Started {
        deadline: Duration,
        recoverable: bool,
    },
    /// 恢复后撤销升级
    Cancelled,
}

/// 处理一条信号的结果
#[derive(Debug, Clone, PartialEq)]
pub struct SignalOutcome {
    pub violation: Option<ViolationEvent>,
    /// 调用方应拦截该按键
    pub suppress: bool,
    pub effect: EscalationEffect,
}

impl SignalOutcome {
    fn ignored() -> Self {
        Self {
            violation: None,
            suppress: false,
            effect: EscalationEffect::Unchanged,
        }
    }
}

/// 环境监控器
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    device_class: DeviceClass,
    policy: EscalationPolicy,
    restricted_keys: RestrictedKeys,
    state: MonitorState,
    fullscreen_lost: bool,
    page_hidden: bool,
    violations: Vec<ViolationEvent>,
}

impl IntegrityMonitor {
    pub fn new(
        device_class: DeviceClass,
        policy: EscalationPolicy,
        restricted_keys: RestrictedKeys,
    ) -> Self {
        Self {
            device_class,
            policy,
            restricted_keys,
            state: MonitorState::Idle,
            fullscreen_lost: false,
            page_hidden: false,
            violations: Vec::new(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    pub fn violations(&self) -> &[ViolationEvent] {
        &self.violations
    }

    pub fn is_terminated(&self) -> bool {
        self.state == MonitorState::Terminated
    }

    /// 当前升级的截止时间
    pub fn deadline(&self) -> Option<Duration> {
        match self.state {
            MonitorState::Warning { deadline, .. }
            | MonitorState::PendingTermination { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    /// 开始监控
    pub fn arm(&mut self) {
        if self.state == MonitorState::Idle {
            self.state = MonitorState::Armed;
            info!("🛡️ 环境监控已启动 (设备: {})", self.device_class);
        }
    }

    /// 会话已结束，撤销监控
    pub fn release(&mut self) {
        if self.state != MonitorState::Terminated {
            self.state = MonitorState::Released;
        }
    }

    fn is_watching(&self) -> bool {
        matches!(
            self.state,
            MonitorState::Armed
                | MonitorState::Warning { .. }
                | MonitorState::PendingTermination { .. }
        )
    }

    fn has_outstanding_condition(&self) -> bool {
        self.fullscreen_lost || self.page_hidden
    }

    /// 处理一条环境信号
    ///
    /// `now` 是会话时钟的单调时间，`wall` 用作事件时间戳
    pub fn handle_signal(
        &mut self,
        signal: &EnvironmentSignal,
        now: Duration,
        wall: DateTime<Utc>,
    ) -> SignalOutcome {
        if !self.is_watching() {
            return SignalOutcome::ignored();
        }

        match signal {
            EnvironmentSignal::FullscreenLost => {
                if self.fullscreen_lost {
                    return SignalOutcome::ignored();
                }
                self.fullscreen_lost = true;
                self.violate(ViolationKind::FullscreenExit, None, false, now, wall)
            }
            EnvironmentSignal::PageHidden => {
                if self.page_hidden {
                    return SignalOutcome::ignored();
                }
                self.page_hidden = true;
                let kind = match self.device_class {
                    DeviceClass::Desktop => ViolationKind::TabSwitch,
                    DeviceClass::Mobile => ViolationKind::AppSwitch,
                };
                self.violate(kind, None, false, now, wall)
            }
            EnvironmentSignal::KeyPressed(chord) => {
                if !self.restricted_keys.is_restricted(chord) {
                    return SignalOutcome::ignored();
                }
                self.violate(
                    ViolationKind::RestrictedKey,
                    Some(chord.to_string()),
                    true,
                    now,
                    wall,
                )
            }
            EnvironmentSignal::FullscreenRestored => {
                self.fullscreen_lost = false;
                self.try_recover()
            }
            EnvironmentSignal::PageVisible => {
                self.page_hidden = false;
                self.try_recover()
            }
        }
    }

    fn violate(
        &mut self,
        kind: ViolationKind,
        detail: Option<String>,
        suppress: bool,
        now: Duration,
        wall: DateTime<Utc>,
    ) -> SignalOutcome {
        let event = ViolationEvent {
            kind,
            device_class: self.device_class,
            timestamp: wall,
            detail,
        };
        self.violations.push(event.clone());
        warn!(
            "🚨 检测到违规: {} (设备: {}, 累计 {} 次)",
            kind,
            self.device_class,
            self.violations.len()
        );

        let effect = if self.state != MonitorState::Armed {
            // 已有升级在进行，不重置也不叠加计时
            EscalationEffect::Unchanged
        } else {
            let deadline = now + self.policy.grace_period;
            self.state = if self.policy.recoverable {
                MonitorState::Warning {
                    trigger: kind,
                    deadline,
                }
            } else {
                MonitorState::PendingTermination {
                    trigger: kind,
                    deadline,
                }
            };
            warn!(
                "⏳ {} 秒后将终止考试{}",
                self.policy.grace_period.as_secs_f64(),
                if self.policy.recoverable {
                    "，请立即恢复"
                } else {
                    ""
                }
            );
            EscalationEffect::Started {
                deadline,
                recoverable: self.policy.recoverable,
            }
        };

        SignalOutcome {
            violation: Some(event),
            suppress,
            effect,
        }
    }

    fn try_recover(&mut self) -> SignalOutcome {
        let mut outcome = SignalOutcome::ignored();
        if let MonitorState::Warning { trigger, .. } = self.state {
            if !self.has_outstanding_condition() {
                self.state = MonitorState::Armed;
                info!("✓ 已恢复 ({} 升级撤销)", trigger);
                outcome.effect = EscalationEffect::Cancelled;
            }
        }
        outcome
    }

    /// 检查升级是否到期；到期时进入 Terminated 并返回触发的违规类型
    pub fn poll(&mut self, now: Duration) -> Option<ViolationKind> {
        let (trigger, deadline) = match self.state {
            MonitorState::Warning { trigger, deadline }
            | MonitorState::PendingTermination { trigger, deadline } => (trigger, deadline),
            _ => return None,
        };

        if now < deadline {
            return None;
        }

        self.state = MonitorState::Terminated;
        warn!("⛔ 违规升级到期 ({})，判定逐出", trigger);
        Some(trigger)
    }
}
