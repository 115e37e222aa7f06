use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 考试会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// 等待考生同意考试须知
    Consent,
    /// 作答中
    Active,
    /// 因违规被终止（终态）
    Terminated,
    /// 正常交卷（终态）
    Completed,
}

impl SessionPhase {
    pub fn is_final(self) -> bool {
        matches!(self, SessionPhase::Terminated | SessionPhase::Completed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Consent => "consent",
            SessionPhase::Active => "active",
            SessionPhase::Terminated => "terminated",
            SessionPhase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// 设备类型，决定违规升级策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    #[default]
    Desktop,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Mobile => f.write_str("mobile"),
            DeviceClass::Desktop => f.write_str("desktop"),
        }
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" | "phone" | "tablet" => Ok(DeviceClass::Mobile),
            "desktop" | "pc" | "laptop" => Ok(DeviceClass::Desktop),
            other => Err(format!("未知的设备类型: {}", other)),
        }
    }
}

/// 交卷原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// 考生主动交卷
    Manual,
    /// 考试时间用尽
    TimeUp,
    /// 违规被逐出
    Expelled,
}

impl SubmitReason {
    /// 交卷后会话进入的终态
    pub fn final_phase(self) -> SessionPhase {
        match self {
            SubmitReason::Manual | SubmitReason::TimeUp => SessionPhase::Completed,
            SubmitReason::Expelled => SessionPhase::Terminated,
        }
    }
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitReason::Manual => f.write_str("manual"),
            SubmitReason::TimeUp => f.write_str("time_up"),
            SubmitReason::Expelled => f.write_str("expelled"),
        }
    }
}
