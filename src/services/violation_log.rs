//! 违规审计日志 - 业务能力层
//!
//! 只负责把违规事件追加写入 JSON Lines 文件，不关心升级流程

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::ViolationEvent;

/// 违规日志写入服务
pub struct ViolationLog {
    log_file_path: String,
    session_label: String,
}

impl ViolationLog {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>, session_label: impl Into<String>) -> Self {
        Self {
            log_file_path: path.into(),
            session_label: session_label.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.log_file_path
    }

    /// 追加一条违规记录
    pub async fn append(&self, event: &ViolationEvent) -> AppResult<()> {
        debug!(
            "写入违规记录: 场次 {} | {} | {}",
            self.session_label, event.kind, event.timestamp
        );

        let mut line = serde_json::to_value(event)?;
        line["session"] = serde_json::Value::String(self.session_label.clone());
        let mut text = serde_json::to_string(&line)?;
        text.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .await
            .map_err(|e| AppError::file_write_failed(&self.log_file_path, e))?;

        file.write_all(text.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(&self.log_file_path, e))?;
        file.flush()
            .await
            .map_err(|e| AppError::file_write_failed(&self.log_file_path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceClass, ViolationKind};
    use chrono::{DateTime, Utc};

    #[tokio::test]
    async fn appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = ViolationLog::with_path(path.to_string_lossy(), "exam-001");

        for kind in [ViolationKind::FullscreenExit, ViolationKind::TabSwitch] {
            let event = ViolationEvent {
                kind,
                device_class: DeviceClass::Desktop,
                timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
                detail: None,
            };
            log.append(&event).await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "fullscreen_exit");
        assert_eq!(lines[1]["type"], "tab_switch");
        assert_eq!(lines[1]["session"], "exam-001");
    }
}
