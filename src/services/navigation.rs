//! 题目导航 - 业务能力层
//!
//! 在"科目 → 题目"两级结构中移动当前题指针，每次成功移动都记录访问

use std::sync::Arc;

use crate::error::{AppResult, SessionError};
use crate::models::{ExamDefinition, QuestionKey};
use crate::services::answer_state::AnswerState;

/// 导航控制器
///
/// 当前题指针始终指向试卷中存在的题目
#[derive(Debug, Clone)]
pub struct NavigationController {
    exam: Arc<ExamDefinition>,
    current: QuestionKey,
}

impl NavigationController {
    /// 指针从第一科第一题开始，试卷须已通过 `validate`
    pub fn new(exam: Arc<ExamDefinition>) -> Self {
        Self {
            exam,
            current: QuestionKey::new(0, 0),
        }
    }

    pub fn current(&self) -> QuestionKey {
        self.current
    }

    fn last_index_of(&self, subject: usize) -> usize {
        self.exam
            .question_count(subject)
            .unwrap_or(1)
            .saturating_sub(1)
    }

    /// 是否位于整张试卷的第一题
    pub fn is_first(&self) -> bool {
        self.current == QuestionKey::new(0, 0)
    }

    /// 是否位于整张试卷的最后一题
    pub fn is_last(&self) -> bool {
        let last_subject = self.exam.subject_count().saturating_sub(1);
        self.current.subject == last_subject
            && self.current.question == self.last_index_of(last_subject)
    }

    fn move_to(&mut self, key: QuestionKey, answers: &mut AnswerState) -> AppResult<QuestionKey> {
        answers.mark_visited(key)?;
        self.current = key;
        Ok(key)
    }

    /// 下一题；已在最后一题时不移动，返回 None
    pub fn next(&mut self, answers: &mut AnswerState) -> AppResult<Option<QuestionKey>> {
        let QuestionKey { subject, question } = self.current;

        let target = if question < self.last_index_of(subject) {
            QuestionKey::new(subject, question + 1)
        } else if subject + 1 < self.exam.subject_count() {
            QuestionKey::new(subject + 1, 0)
        } else {
            return Ok(None);
        };

        self.move_to(target, answers).map(Some)
    }

    /// 上一题；在科目第一题时跳到上一科目的最后一题
    pub fn prev(&mut self, answers: &mut AnswerState) -> AppResult<Option<QuestionKey>> {
        let QuestionKey { subject, question } = self.current;

        let target = if question > 0 {
            QuestionKey::new(subject, question - 1)
        } else if subject > 0 {
            QuestionKey::new(subject - 1, self.last_index_of(subject - 1))
        } else {
            return Ok(None);
        };

        self.move_to(target, answers).map(Some)
    }

    /// 直接跳转到指定题目
    pub fn go_to(&mut self, key: QuestionKey, answers: &mut AnswerState) -> AppResult<QuestionKey> {
        if !self.exam.contains(key) {
            return Err(SessionError::QuestionOutOfRange { key }.into());
        }
        self.move_to(key, answers)
    }

    /// 跳转到指定科目的第一题
    pub fn go_to_subject(
        &mut self,
        subject: usize,
        answers: &mut AnswerState,
    ) -> AppResult<QuestionKey> {
        let count = self.exam.subject_count();
        if subject >= count {
            return Err(SessionError::SubjectOutOfRange {
                index: subject,
                count,
            }
            .into());
        }
        self.go_to(QuestionKey::new(subject, 0), answers)
    }
}
