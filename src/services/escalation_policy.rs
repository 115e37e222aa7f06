//! 违规升级策略
//!
//! 状态机只读取策略对象，新增设备类型或调整宽限期不需要改动监控逻辑

use std::time::Duration;

use crate::models::DeviceClass;

/// 一种设备的升级策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// 从违规到终止的时长
    pub grace_period: Duration,
    /// 宽限期内恢复是否可以撤销升级
    pub recoverable: bool,
}

impl EscalationPolicy {
    /// 桌面端：3 秒后逐出，无法恢复
    pub const fn desktop() -> Self {
        Self {
            grace_period: Duration::from_secs(3),
            recoverable: false,
        }
    }

    /// 移动端：5 秒宽限期，期间恢复即可撤销
    pub const fn mobile() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            recoverable: true,
        }
    }
}

/// 按设备类型选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTable {
    pub mobile: EscalationPolicy,
    pub desktop: EscalationPolicy,
}

impl PolicyTable {
    pub fn policy_for(&self, device_class: DeviceClass) -> EscalationPolicy {
        match device_class {
            DeviceClass::Mobile => self.mobile,
            DeviceClass::Desktop => self.desktop,
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            mobile: EscalationPolicy::mobile(),
            desktop: EscalationPolicy::desktop(),
        }
    }
}
