use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::error::ConfigError;
use crate::models::DeviceClass;
use crate::services::{EscalationPolicy, PolicyTable, PoseCalibration, RestrictedKeys};
use crate::workflow::{CaptureConfig, SessionSettings};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 试卷 TOML 文件存放目录
    pub exam_folder: String,
    /// 要加载的试卷编号（对应 `<exam_folder>/<exam_id>.toml`）
    pub exam_id: String,
    pub device_class: DeviceClass,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 违规审计日志文件
    pub violation_log_file: String,
    // --- 外部服务 ---
    pub grading_api_url: String,
    pub verification_api_url: String,
    /// 为空时不带认证头
    pub api_token: String,
    pub submit_max_retries: usize,
    // --- 违规升级 ---
    pub desktop_grace_ms: u64,
    pub mobile_grace_ms: u64,
    /// 逗号分隔的受限按键，为空时使用内置列表
    pub restricted_keys: String,
    // --- 人脸采集 ---
    pub yaw_scale: f64,
    pub pitch_scale: f64,
    pub capture_poll_ms: u64,
    pub capture_required_samples: u32,
    pub capture_settle_ms: u64,
    pub detector_load_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exam_folder: "exams".to_string(),
            exam_id: "demo".to_string(),
            device_class: DeviceClass::Desktop,
            verbose_logging: false,
            violation_log_file: "violations.jsonl".to_string(),
            grading_api_url: "http://127.0.0.1:8080/api/exam/submit".to_string(),
            verification_api_url: "http://127.0.0.1:8080/api/identity/verify".to_string(),
            api_token: String::new(),
            submit_max_retries: 3,
            desktop_grace_ms: 3_000,
            mobile_grace_ms: 5_000,
            restricted_keys: String::new(),
            yaw_scale: 40.0,
            pitch_scale: 60.0,
            capture_poll_ms: 120,
            capture_required_samples: 4,
            capture_settle_ms: 800,
            detector_load_timeout_ms: 15_000,
        }
    }
}

/// 读取并解析环境变量，缺失或无法解析时使用默认值
fn env_or<T: FromStr>(var_name: &str, default: T) -> T {
    let Ok(value) = std::env::var(var_name) else {
        return default;
    };
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            };
            warn!("⚠️ {}，使用默认值", err);
            default
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            exam_folder: std::env::var("EXAM_FOLDER").unwrap_or(default.exam_folder),
            exam_id: std::env::var("EXAM_ID").unwrap_or(default.exam_id),
            device_class: env_or("DEVICE_CLASS", default.device_class),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging),
            violation_log_file: std::env::var("VIOLATION_LOG_FILE").unwrap_or(default.violation_log_file),
            grading_api_url: std::env::var("GRADING_API_URL").unwrap_or(default.grading_api_url),
            verification_api_url: std::env::var("VERIFICATION_API_URL").unwrap_or(default.verification_api_url),
            api_token: std::env::var("API_TOKEN").unwrap_or(default.api_token),
            submit_max_retries: env_or("SUBMIT_MAX_RETRIES", default.submit_max_retries),
            desktop_grace_ms: env_or("DESKTOP_GRACE_MS", default.desktop_grace_ms),
            mobile_grace_ms: env_or("MOBILE_GRACE_MS", default.mobile_grace_ms),
            restricted_keys: std::env::var("RESTRICTED_KEYS").unwrap_or(default.restricted_keys),
            yaw_scale: env_or("YAW_SCALE", default.yaw_scale),
            pitch_scale: env_or("PITCH_SCALE", default.pitch_scale),
            capture_poll_ms: env_or("CAPTURE_POLL_MS", default.capture_poll_ms),
            capture_required_samples: env_or("CAPTURE_REQUIRED_SAMPLES", default.capture_required_samples),
            capture_settle_ms: env_or("CAPTURE_SETTLE_MS", default.capture_settle_ms),
            detector_load_timeout_ms: env_or("DETECTOR_LOAD_TIMEOUT_MS", default.detector_load_timeout_ms),
        }
    }

    /// API 认证令牌，未配置时为 None
    pub fn api_token(&self) -> Option<&str> {
        Some(self.api_token.trim()).filter(|t| !t.is_empty())
    }

    pub fn policy_table(&self) -> PolicyTable {
        PolicyTable {
            desktop: EscalationPolicy {
                grace_period: Duration::from_millis(self.desktop_grace_ms),
                ..EscalationPolicy::desktop()
            },
            mobile: EscalationPolicy {
                grace_period: Duration::from_millis(self.mobile_grace_ms),
                ..EscalationPolicy::mobile()
            },
        }
    }

    pub fn restricted_keys(&self) -> Result<RestrictedKeys, ConfigError> {
        if self.restricted_keys.trim().is_empty() {
            Ok(RestrictedKeys::default())
        } else {
            RestrictedKeys::parse_list(&self.restricted_keys)
        }
    }

    pub fn session_settings(&self) -> Result<SessionSettings, ConfigError> {
        Ok(SessionSettings {
            device_class: self.device_class,
            policies: self.policy_table(),
            restricted_keys: self.restricted_keys()?,
        })
    }

    pub fn pose_calibration(&self) -> PoseCalibration {
        PoseCalibration {
            yaw_scale: self.yaw_scale,
            pitch_scale: self.pitch_scale,
            ..PoseCalibration::default()
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            required_consecutive: self.capture_required_samples.max(1),
            poll_interval: Duration::from_millis(self.capture_poll_ms.max(1)),
            settle_pause: Duration::from_millis(self.capture_settle_ms),
            detector_load_timeout: Duration::from_millis(self.detector_load_timeout_ms),
            ..CaptureConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeyChord;

    #[test]
    fn defaults_match_the_built_in_policies() {
        let config = Config::default();
        assert_eq!(config.policy_table(), PolicyTable::default());
        assert_eq!(config.pose_calibration(), PoseCalibration::default());
        assert_eq!(config.capture_config(), CaptureConfig::default());
        assert_eq!(config.api_token(), None);
    }

    #[test]
    fn custom_values_flow_into_typed_options() {
        let config = Config {
            mobile_grace_ms: 8_000,
            yaw_scale: 55.0,
            capture_required_samples: 0,
            restricted_keys: "F12, Ctrl+Shift+I".to_string(),
            api_token: "  secret ".to_string(),
            ..Config::default()
        };

        let policies = config.policy_table();
        assert_eq!(policies.mobile.grace_period, Duration::from_secs(8));
        assert!(policies.mobile.recoverable);
        assert!(!policies.desktop.recoverable);
        assert_eq!(config.pose_calibration().yaw_scale, 55.0);
        assert_eq!(config.capture_config().required_consecutive, 1);
        assert_eq!(config.api_token(), Some("secret"));

        let keys = config.restricted_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.is_restricted(&KeyChord::plain("f12")));
        assert!(!keys.is_restricted(&KeyChord::with_modifiers("c", true, false, false, false)));
    }

    #[test]
    fn bad_key_list_is_a_config_error() {
        let config = Config {
            restricted_keys: "Ctrl+".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.session_settings(),
            Err(ConfigError::InvalidKeyChord { .. })
        ));
    }
}
