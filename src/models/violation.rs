//! 环境信号与违规记录

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::ConfigError;
use crate::models::DeviceClass;

/// 违规类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    FullscreenExit,
    TabSwitch,
    AppSwitch,
    RestrictedKey,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::FullscreenExit => "fullscreen_exit",
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::AppSwitch => "app_switch",
            ViolationKind::RestrictedKey => "restricted_key",
        };
        f.write_str(name)
    }
}

/// 违规事件（只追加的审计记录）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub device_class: DeviceClass,
    pub timestamp: DateTime<Utc>,
    /// 触发的按键组合（仅 restricted_key）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 运行环境上报的原始信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentSignal {
    FullscreenLost,
    FullscreenRestored,
    /// 页面不可见（切换标签页 / 切到后台）
    PageHidden,
    PageVisible,
    KeyPressed(KeyChord),
}

/// 按键组合，例如 `Ctrl+Shift+I`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    /// 归一化后的按键名（大写）
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyChord {
    /// 单个按键，无修饰键
    pub fn plain(key: &str) -> Self {
        Self::with_modifiers(key, false, false, false, false)
    }

    pub fn with_modifiers(key: &str, ctrl: bool, alt: bool, shift: bool, meta: bool) -> Self {
        let key = normalize_key(key);
        // 单独按下修饰键时，浏览器会同时置位对应的修饰标志
        Self {
            ctrl: ctrl && key != "CTRL",
            alt: alt && key != "ALT",
            shift: shift && key != "SHIFT",
            meta: meta && key != "META",
            key,
        }
    }
}

fn normalize_key(key: &str) -> String {
    let upper = key.trim().to_ascii_uppercase();
    match upper.as_str() {
        "CONTROL" => "CTRL".to_string(),
        "OPTION" => "ALT".to_string(),
        "CMD" | "COMMAND" | "WIN" | "OS" | "SUPER" => "META".to_string(),
        "PRTSC" | "PRINT" | "PRTSCN" => "PRINTSCREEN".to_string(),
        _ => upper,
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.meta {
            f.write_str("Meta+")?;
        }
        f.write_str(&self.key)
    }
}

fn chord_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*((?:(?:ctrl|control|alt|option|shift|meta|cmd|win)\s*\+\s*)*)([a-z0-9]+)\s*$")
            .expect("按键组合正则表达式无效")
    })
}

fn modifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)ctrl|control|alt|option|shift|meta|cmd|win").expect("修饰键正则表达式无效")
    })
}

impl FromStr for KeyChord {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = chord_pattern()
            .captures(s)
            .ok_or_else(|| ConfigError::InvalidKeyChord {
                chord: s.to_string(),
            })?;

        let (mut ctrl, mut alt, mut shift, mut meta) = (false, false, false, false);
        if let Some(mods) = caps.get(1) {
            for m in modifier_pattern().find_iter(mods.as_str()) {
                match normalize_key(m.as_str()).as_str() {
                    "CTRL" => ctrl = true,
                    "ALT" => alt = true,
                    "SHIFT" => shift = true,
                    _ => meta = true,
                }
            }
        }

        Ok(KeyChord::with_modifiers(&caps[2], ctrl, alt, shift, meta))
    }
}
