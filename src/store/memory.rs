// src/store/memory.rs

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AttemptFilter, AttemptStore, in_progress_conflict};
use crate::{
    error::AppError,
    models::quiz_attempt::{AttemptStatus, NewQuizAttempt, QuizAttempt},
};

/// Process-local store used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryAttemptStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    /// Insertion order, which is also id order.
    attempts: Vec<QuizAttempt>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an attempt as-is. Lets tests seed rows with arbitrary state.
    pub async fn seed(&self, mut attempt: QuizAttempt) -> QuizAttempt {
        let mut inner = self.inner.write().await;
        inner.last_id = inner.last_id.max(attempt.id);
        if attempt.id == 0 {
            inner.last_id += 1;
            attempt.id = inner.last_id;
        }
        inner.attempts.push(attempt.clone());
        inner.attempts.sort_by_key(|a| a.id);
        attempt
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn find_one(&self, filter: &AttemptFilter) -> Result<Option<QuizAttempt>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.attempts.iter().rev().find(|a| filter.matches(a)).cloned())
    }

    async fn find_many(&self, filter: &AttemptFilter) -> Result<Vec<QuizAttempt>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .iter()
            .rev()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &AttemptFilter) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.attempts.iter().filter(|a| filter.matches(a)).count() as i64)
    }

    async fn insert(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, AppError> {
        let mut inner = self.inner.write().await;

        let same_lesson = |a: &&QuizAttempt| {
            a.student_id == attempt.student_id && a.lesson_id == attempt.lesson_id
        };

        if inner
            .attempts
            .iter()
            .filter(same_lesson)
            .any(|a| a.status == AttemptStatus::InProgress)
        {
            return Err(in_progress_conflict());
        }

        if inner
            .attempts
            .iter()
            .filter(same_lesson)
            .any(|a| a.attempt_number == attempt.attempt_number)
        {
            return Err(AppError::Conflict(format!(
                "Attempt number {} already exists for this quiz",
                attempt.attempt_number
            )));
        }

        inner.last_id += 1;
        let stored = attempt.into_attempt(inner.last_id);
        inner.attempts.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, attempt: &QuizAttempt) -> Result<Option<QuizAttempt>, AppError> {
        let mut inner = self.inner.write().await;

        let Some(slot) = inner.attempts.iter_mut().find(|a| a.id == attempt.id) else {
            return Ok(None);
        };

        if slot.status != AttemptStatus::InProgress || slot.version != attempt.version {
            return Ok(None);
        }

        let mut stored = attempt.clone();
        stored.version += 1;
        *slot = stored.clone();
        Ok(Some(stored))
    }
}
