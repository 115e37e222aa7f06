//! 作答状态 - 业务能力层
//!
//! 保存每道题的作答 / 标记复查 / 已访问信息，并计算题号面板状态

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{AppError, AppResult, SessionError};
use crate::models::{AnswerRecord, ExamDefinition, QuestionKey, SessionPhase};

/// 题号面板上的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionStatus {
    Current,
    Review,
    Answered,
    Visited,
    NotVisited,
}

/// 题号面板统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PaletteSummary {
    pub answered: usize,
    /// 访问过但没有作答
    pub not_answered: usize,
    pub review: usize,
    pub not_visited: usize,
}

/// 作答状态
///
/// 只在 `unlock` 之后、`freeze` 之前接受修改
#[derive(Debug, Clone)]
pub struct AnswerState {
    exam: Arc<ExamDefinition>,
    answers: BTreeMap<QuestionKey, usize>,
    review_marked: BTreeSet<QuestionKey>,
    visited: BTreeSet<QuestionKey>,
    phase: SessionPhase,
}

impl AnswerState {
    pub fn new(exam: Arc<ExamDefinition>) -> Self {
        Self {
            exam,
            answers: BTreeMap::new(),
            review_marked: BTreeSet::new(),
            visited: BTreeSet::new(),
            phase: SessionPhase::Consent,
        }
    }

    /// 开放作答
    pub fn unlock(&mut self) {
        if self.phase == SessionPhase::Consent {
            self.phase = SessionPhase::Active;
        }
    }

    /// 冻结作答，之后所有修改都会被拒绝
    pub fn freeze(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub fn is_frozen(&self) -> bool {
        self.phase != SessionPhase::Active
    }

    fn ensure_writable(&self, operation: &'static str) -> AppResult<()> {
        if self.phase == SessionPhase::Active {
            Ok(())
        } else {
            Err(AppError::wrong_phase(self.phase, operation))
        }
    }

    fn ensure_key(&self, key: QuestionKey) -> AppResult<()> {
        if self.exam.contains(key) {
            Ok(())
        } else {
            Err(SessionError::QuestionOutOfRange { key }.into())
        }
    }

    /// 作答，覆盖之前的选择
    pub fn set_answer(&mut self, key: QuestionKey, option: usize) -> AppResult<()> {
        self.ensure_writable("set_answer")?;
        let count = self
            .exam
            .question(key)
            .map(|q| q.options.len())
            .ok_or(SessionError::QuestionOutOfRange { key })?;
        if option >= count {
            return Err(SessionError::OptionOutOfRange { key, option, count }.into());
        }

        self.answers.insert(key, option);
        Ok(())
    }

    /// 清除作答，返回之前的选择
    pub fn clear_answer(&mut self, key: QuestionKey) -> AppResult<Option<usize>> {
        self.ensure_writable("clear_answer")?;
        self.ensure_key(key)?;
        Ok(self.answers.remove(&key))
    }

    /// 切换复查标记，返回切换后是否被标记
    pub fn toggle_review(&mut self, key: QuestionKey) -> AppResult<bool> {
        self.ensure_writable("toggle_review")?;
        self.ensure_key(key)?;
        if self.review_marked.remove(&key) {
            Ok(false)
        } else {
            self.review_marked.insert(key);
            Ok(true)
        }
    }

    /// 记录访问
    pub fn mark_visited(&mut self, key: QuestionKey) -> AppResult<()> {
        self.ensure_writable("mark_visited")?;
        self.ensure_key(key)?;
        self.visited.insert(key);
        Ok(())
    }

    pub fn answer(&self, key: QuestionKey) -> Option<usize> {
        self.answers.get(&key).copied()
    }

    pub fn is_review_marked(&self, key: QuestionKey) -> bool {
        self.review_marked.contains(&key)
    }

    pub fn is_visited(&self, key: QuestionKey) -> bool {
        self.visited.contains(&key)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// 题号状态，按 当前 > 复查 > 已答 > 已访问 > 未访问 的优先级
    pub fn status_of(&self, key: QuestionKey, current: QuestionKey) -> QuestionStatus {
        if key == current {
            QuestionStatus::Current
        } else if self.review_marked.contains(&key) {
            QuestionStatus::Review
        } else if self.answers.contains_key(&key) {
            QuestionStatus::Answered
        } else if self.visited.contains(&key) {
            QuestionStatus::Visited
        } else {
            QuestionStatus::NotVisited
        }
    }

    /// 题号面板统计（不区分当前题）
    pub fn summary(&self) -> PaletteSummary {
        let mut summary = PaletteSummary::default();
        for key in self.exam.keys() {
            if self.review_marked.contains(&key) {
                summary.review += 1;
            } else if self.answers.contains_key(&key) {
                summary.answered += 1;
            } else if self.visited.contains(&key) {
                summary.not_answered += 1;
            } else {
                summary.not_visited += 1;
            }
        }
        summary
    }

    /// 按试卷顺序导出作答
    pub fn records(&self) -> Vec<AnswerRecord> {
        self.answers
            .iter()
            .map(|(key, option)| AnswerRecord {
                subject_index: key.subject,
                question_index: key.question,
                selected_option: *option,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam::fixtures::exam;

    fn active_state() -> AnswerState {
        let mut state = AnswerState::new(Arc::new(exam(2, 3, 10)));
        state.unlock();
        state
    }

    #[test]
    fn writes_are_rejected_outside_active() {
        let mut state = AnswerState::new(Arc::new(exam(1, 2, 10)));
        let key = QuestionKey::new(0, 0);

        assert!(state.set_answer(key, 0).is_err());
        state.unlock();
        assert!(state.set_answer(key, 0).is_ok());
        state.freeze(SessionPhase::Completed);
        assert!(state.set_answer(key, 1).is_err());
        assert!(state.toggle_review(key).is_err());
        assert_eq!(state.answer(key), Some(0));
    }

    #[test]
    fn set_answer_overwrites_and_checks_bounds() {
        let mut state = active_state();
        let key = QuestionKey::new(1, 2);

        state.set_answer(key, 1).unwrap();
        state.set_answer(key, 3).unwrap();
        assert_eq!(state.answer(key), Some(3));
        assert_eq!(state.answered_count(), 1);

        assert!(matches!(
            state.set_answer(key, 4),
            Err(AppError::Session(SessionError::OptionOutOfRange { count: 4, .. }))
        ));
        assert!(state.set_answer(QuestionKey::new(0, 3), 0).is_err());
        assert!(state.set_answer(QuestionKey::new(2, 0), 0).is_err());
    }

    #[test]
    fn toggle_review_flips_membership() {
        let mut state = active_state();
        let key = QuestionKey::new(0, 1);

        assert!(state.toggle_review(key).unwrap());
        assert!(state.is_review_marked(key));
        assert!(!state.toggle_review(key).unwrap());
        assert!(!state.is_review_marked(key));
    }

    #[test]
    fn status_precedence_holds_when_conditions_overlap() {
        let mut state = active_state();
        let key = QuestionKey::new(0, 0);
        let elsewhere = QuestionKey::new(1, 1);

        assert_eq!(state.status_of(key, elsewhere), QuestionStatus::NotVisited);
        state.mark_visited(key).unwrap();
        assert_eq!(state.status_of(key, elsewhere), QuestionStatus::Visited);
        state.set_answer(key, 2).unwrap();
        assert_eq!(state.status_of(key, elsewhere), QuestionStatus::Answered);
        state.toggle_review(key).unwrap();
        assert_eq!(state.status_of(key, elsewhere), QuestionStatus::Review);
        assert_eq!(state.status_of(key, key), QuestionStatus::Current);
    }

    #[test]
    fn summary_and_records_follow_exam_order() {
        let mut state = active_state();
        state.set_answer(QuestionKey::new(1, 0), 1).unwrap();
        state.set_answer(QuestionKey::new(0, 2), 0).unwrap();
        state.toggle_review(QuestionKey::new(0, 1)).unwrap();
        state.mark_visited(QuestionKey::new(0, 0)).unwrap();
        assert_eq!(state.clear_answer(QuestionKey::new(1, 0)).unwrap(), Some(1));
        state.mark_visited(QuestionKey::new(1, 0)).unwrap();

        assert_eq!(
            state.summary(),
            PaletteSummary {
                answered: 1,
                not_answered: 2,
                review: 1,
                not_visited: 2,
            }
        );
        let keys: Vec<_> = state.records().iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec![QuestionKey::new(0, 2)]);
    }
}
