// src/store/mod.rs

//! Persistence boundary for quiz attempts.
//!
//! Both backends enforce the same two guards at write time:
//! * `insert` refuses a second `in_progress` attempt for a (student, lesson)
//!   pair and a duplicate attempt number, returning `AppError::Conflict`.
//! * `update` is a compare-and-swap on `(status = in_progress, version)`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::quiz_attempt::{AttemptStatus, NewQuizAttempt, QuizAttempt},
};

pub use memory::MemoryAttemptStore;
pub use postgres::PgAttemptStore;

/// Selection criteria. Unset fields match anything; set fields are ANDed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptFilter {
    pub id: Option<i64>,
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub status: Option<AttemptStatus>,
}

impl AttemptFilter {
    /// A specific attempt, only if it belongs to `student_id`.
    pub fn owned(attempt_id: i64, student_id: i64) -> Self {
        Self {
            id: Some(attempt_id),
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn student_lesson(student_id: i64, lesson_id: i64) -> Self {
        Self {
            student_id: Some(student_id),
            lesson_id: Some(lesson_id),
            ..Self::default()
        }
    }

    pub fn course(course_id: i64) -> Self {
        Self {
            course_id: Some(course_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: AttemptStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, attempt: &QuizAttempt) -> bool {
        self.id.is_none_or(|id| attempt.id == id)
            && self.student_id.is_none_or(|id| attempt.student_id == id)
            && self.course_id.is_none_or(|id| attempt.course_id == id)
            && self.lesson_id.is_none_or(|id| attempt.lesson_id == id)
            && self.status.is_none_or(|status| attempt.status == status)
    }
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Most recently created attempt matching `filter`.
    async fn find_one(&self, filter: &AttemptFilter) -> Result<Option<QuizAttempt>, AppError>;

    /// All matching attempts, most recently created first.
    async fn find_many(&self, filter: &AttemptFilter) -> Result<Vec<QuizAttempt>, AppError>;

    async fn count(&self, filter: &AttemptFilter) -> Result<i64, AppError>;

    async fn insert(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, AppError>;

    /// Persists `attempt` if the stored row is still in progress at the same
    /// version. Returns the stored row, or `None` when the guard failed.
    async fn update(&self, attempt: &QuizAttempt) -> Result<Option<QuizAttempt>, AppError>;
}

pub(crate) fn in_progress_conflict() -> AppError {
    AppError::Conflict("An in-progress attempt already exists for this quiz".to_string())
}
