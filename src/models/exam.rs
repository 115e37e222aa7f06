//! 试卷定义
//!
//! 由外部题库提供，会话期间只读

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult, SessionError};

/// 单道题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    #[serde(default = "default_marks")]
    pub marks: f64,
}

fn default_marks() -> f64 {
    1.0
}

/// 科目（试卷中的一个分区）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// 试卷定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamDefinition {
    pub id: String,
    pub title: String,
    pub code: String,
    /// 考试时长（分钟）
    pub duration_minutes: u32,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl ExamDefinition {
    /// 考试总秒数
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// 指定科目的题目数量，科目不存在时返回 None
    pub fn question_count(&self, subject_index: usize) -> Option<usize> {
        self.subjects.get(subject_index).map(|s| s.questions.len())
    }

    pub fn total_questions(&self) -> usize {
        self.subjects.iter().map(|s| s.questions.len()).sum()
    }

    pub fn contains(&self, key: QuestionKey) -> bool {
        self.question(key).is_some()
    }

    pub fn question(&self, key: QuestionKey) -> Option<&Question> {
        self.subjects
            .get(key.subject)
            .and_then(|s| s.questions.get(key.question))
    }

    /// 按试卷顺序遍历全部题目坐标
    pub fn keys(&self) -> impl Iterator<Item = QuestionKey> + '_ {
        self.subjects.iter().enumerate().flat_map(|(s, subject)| {
            (0..subject.questions.len()).map(move |q| QuestionKey::new(s, q))
        })
    }

    /// 校验试卷结构
    ///
    /// 导航与作答都假设每个科目至少有一道题、每道题至少有一个选项
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: String| -> AppError { SessionError::InvalidExam { reason }.into() };

        if self.duration_minutes == 0 {
            return Err(invalid("考试时长必须大于 0".to_string()));
        }
        if self.subjects.is_empty() {
            return Err(invalid("试卷没有任何科目".to_string()));
        }
        for (s, subject) in self.subjects.iter().enumerate() {
            if subject.questions.is_empty() {
                return Err(invalid(format!("科目 {} ({}) 没有题目", s, subject.name)));
            }
            for (q, question) in subject.questions.iter().enumerate() {
                if question.options.is_empty() {
                    return Err(invalid(format!("题目 {}-{} 没有选项", s, q)));
                }
            }
        }
        Ok(())
    }
}

/// 题目坐标（科目索引, 题目索引）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionKey {
    pub subject: usize,
    pub question: usize,
}

impl QuestionKey {
    pub const fn new(subject: usize, question: usize) -> Self {
        Self { subject, question }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.subject, self.question)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 构造 `subjects` 个科目、每科 `per_subject` 道四选一题目的试卷
    pub fn exam(subjects: usize, per_subject: usize, duration_minutes: u32) -> ExamDefinition {
        ExamDefinition {
            id: "exam-001".to_string(),
            title: "模拟考试".to_string(),
            code: "MOCK-01".to_string(),
            duration_minutes,
            subjects: (0..subjects)
                .map(|s| Subject {
                    name: format!("科目{}", s + 1),
                    questions: (0..per_subject)
                        .map(|q| Question {
                            text: format!("第 {} 题", q + 1),
                            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                            marks: 1.0,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
