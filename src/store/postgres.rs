// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::{AttemptFilter, AttemptStore, in_progress_conflict};
use crate::{
    error::AppError,
    models::quiz_attempt::{NewQuizAttempt, QuizAnswer, QuizAttempt},
};

const COLUMNS: &str = "\
    id, student_id, course_id, lesson_id, attempt_number, status, started_at, \
    completed_at, time_spent, answers, total_questions, correct_answers, score, \
    passed, passing_threshold, version";

const IN_PROGRESS_INDEX: &str = "quiz_attempts_in_progress_uniq";

/// `AttemptStore` backed by the `quiz_attempts` table.
#[derive(Debug, Clone)]
pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &AttemptFilter) {
    builder.push(" WHERE TRUE");
    if let Some(id) = filter.id {
        builder.push(" AND id = ").push_bind(id);
    }
    if let Some(student_id) = filter.student_id {
        builder.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(course_id) = filter.course_id {
        builder.push(" AND course_id = ").push_bind(course_id);
    }
    if let Some(lesson_id) = filter.lesson_id {
        builder.push(" AND lesson_id = ").push_bind(lesson_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

fn select(filter: &AttemptFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {COLUMNS} FROM quiz_attempts"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY id DESC");
    builder
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn find_one(&self, filter: &AttemptFilter) -> Result<Option<QuizAttempt>, AppError> {
        let mut builder = select(filter);
        builder.push(" LIMIT 1");

        let attempt = builder
            .build_query_as::<QuizAttempt>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch quiz attempt: {:?}", e);
                AppError::from(e)
            })?;

        Ok(attempt)
    }

    async fn find_many(&self, filter: &AttemptFilter) -> Result<Vec<QuizAttempt>, AppError> {
        let attempts = select(filter)
            .build_query_as::<QuizAttempt>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list quiz attempts: {:?}", e);
                AppError::from(e)
            })?;

        Ok(attempts)
    }

    async fn count(&self, filter: &AttemptFilter) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quiz_attempts");
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn insert(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, AppError> {
        let fresh = attempt.into_attempt(0);

        let inserted = sqlx::query_as::<_, QuizAttempt>(&format!(
            "INSERT INTO quiz_attempts (
                student_id, course_id, lesson_id, attempt_number, status, started_at,
                answers, total_questions, correct_answers, score, passed, passing_threshold
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        ))
        .bind(fresh.student_id)
        .bind(fresh.course_id)
        .bind(fresh.lesson_id)
        .bind(fresh.attempt_number)
        .bind(fresh.status)
        .bind(fresh.started_at)
        .bind(Json(Vec::<QuizAnswer>::new()))
        .bind(fresh.results.total_questions)
        .bind(fresh.results.correct_answers)
        .bind(fresh.results.score)
        .bind(fresh.results.passed)
        .bind(fresh.results.passing_threshold)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    if db.constraint() == Some(IN_PROGRESS_INDEX) {
                        return in_progress_conflict();
                    }
                    return AppError::Conflict(format!(
                        "Attempt number {} already exists for this quiz",
                        fresh.attempt_number
                    ));
                }
            }
            tracing::error!("Failed to insert quiz attempt: {:?}", e);
            AppError::from(e)
        })?;

        Ok(inserted)
    }

    async fn update(&self, attempt: &QuizAttempt) -> Result<Option<QuizAttempt>, AppError> {
        let updated = sqlx::query_as::<_, QuizAttempt>(&format!(
            "UPDATE quiz_attempts SET
                status = $1,
                completed_at = $2,
                time_spent = $3,
                answers = $4,
                correct_answers = $5,
                score = $6,
                passed = $7,
                version = version + 1
             WHERE id = $8 AND status = 'in_progress' AND version = $9
             RETURNING {COLUMNS}"
        ))
        .bind(attempt.status)
        .bind(attempt.completed_at)
        .bind(attempt.time_spent)
        .bind(&attempt.answers)
        .bind(attempt.results.correct_answers)
        .bind(attempt.results.score)
        .bind(attempt.results.passed)
        .bind(attempt.id)
        .bind(attempt.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update quiz attempt {}: {:?}", attempt.id, e);
            AppError::from(e)
        })?;

        Ok(updated)
    }
}
