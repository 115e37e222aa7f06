use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DeviceClass, QuestionKey, SubmitReason};

/// 单题作答记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub subject_index: usize,
    pub question_index: usize,
    pub selected_option: usize,
}

impl AnswerRecord {
    pub fn key(&self) -> QuestionKey {
        QuestionKey::new(self.subject_index, self.question_index)
    }
}

/// 交卷数据，交给外部阅卷服务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub exam_id: String,
    /// 按试卷顺序排列的作答
    pub answers: Vec<AnswerRecord>,
    pub answered_count: usize,
    /// 用时（秒）
    pub time_spent: u64,
    pub reason: SubmitReason,
    pub device_class: DeviceClass,
    pub timestamp: DateTime<Utc>,
}

/// 阅卷服务的回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingReceipt {
    pub accepted: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// 身份核验服务的回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReceipt {
    pub accepted: bool,
    #[serde(default)]
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case_on_the_wire() {
        let payload = SubmissionPayload {
            exam_id: "exam-001".into(),
            answers: vec![AnswerRecord {
                subject_index: 0,
                question_index: 2,
                selected_option: 1,
            }],
            answered_count: 1,
            time_spent: 50,
            reason: SubmitReason::Manual,
            device_class: DeviceClass::Mobile,
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["examId"], "exam-001");
        assert_eq!(json["timeSpent"], 50);
        assert_eq!(json["reason"], "manual");
        assert_eq!(json["deviceClass"], "mobile");
        assert_eq!(json["answers"][0]["selectedOption"], 1);
        assert_eq!(payload.answers[0].key(), QuestionKey::new(0, 2));
    }
}
