// src/models/quiz_attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::{Validate, ValidationError};

use crate::{config::DEFAULT_PASSING_THRESHOLD, error::AppError};

/// Lifecycle of an attempt. `Completed` and `Abandoned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "quiz_attempt_status", rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }

    /// Only `in_progress` has outbound edges.
    pub fn can_transition_to(self, next: AttemptStatus) -> bool {
        self == AttemptStatus::InProgress && next.is_terminal()
    }
}

/// One recorded answer. At most one per `question_index` within an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question_index: i32,
    /// Opaque to this service: an option label, a boolean, or free text.
    pub selected_answer: serde_json::Value,
    /// Supplied by the client and trusted as-is.
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Derived scoring block. Recomputed from `answers`, never edited field by field.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct QuizResults {
    pub total_questions: i32,
    pub correct_answers: i32,
    /// Percentage, rounded to the nearest integer.
    pub score: i32,
    pub passed: bool,
    pub passing_threshold: i32,
}

impl QuizResults {
    pub fn new(total_questions: i32, passing_threshold: i32) -> Self {
        let mut results = Self {
            total_questions,
            correct_answers: 0,
            score: 0,
            passed: false,
            passing_threshold,
        };
        results.apply(0);
        results
    }

    fn apply(&mut self, correct_answers: i32) {
        self.correct_answers = correct_answers;
        self.score = percentage(correct_answers, self.total_questions);
        self.passed = self.score >= self.passing_threshold;
    }
}

/// How far through the quiz the student is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizProgress {
    pub answered: i32,
    pub total: i32,
    pub percentage: i32,
}

/// Represents the 'quiz_attempts' table in the database.
/// One student's single try at one lesson's quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub lesson_id: i64,

    /// 1-based, strictly increasing per (student, lesson).
    pub attempt_number: i32,

    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,

    /// Stamped once, when the attempt leaves `in_progress`.
    pub completed_at: Option<DateTime<Utc>>,

    /// Seconds between start and completion. Only set on completion.
    pub time_spent: Option<i64>,

    /// Answers in submission order. Stored as a JSON array.
    pub answers: Json<Vec<QuizAnswer>>,

    #[sqlx(flatten)]
    pub results: QuizResults,

    /// Optimistic concurrency token, bumped by every successful store update.
    #[serde(skip)]
    pub version: i32,
}

impl QuizAttempt {
    pub fn is_owned_by(&self, student_id: i64) -> bool {
        self.student_id == student_id
    }

    /// Replaces any prior answer for the same question, then rescores.
    pub fn record_answer(
        &mut self,
        question_index: i32,
        selected_answer: serde_json::Value,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.ensure_in_progress()?;

        self.answers.retain(|a| a.question_index != question_index);
        self.answers.push(QuizAnswer {
            question_index,
            selected_answer,
            is_correct,
            answered_at,
        });
        self.recompute_results();
        Ok(())
    }

    pub fn recompute_results(&mut self) {
        let correct = self.answers.iter().filter(|a| a.is_correct).count() as i32;
        self.results.apply(correct);
    }

    pub fn progress(&self) -> QuizProgress {
        let answered = self.answers.len() as i32;
        let total = self.results.total_questions;
        QuizProgress {
            answered,
            total,
            percentage: percentage(answered, total),
        }
    }

    /// Finalizes the attempt and returns the elapsed seconds.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<i64, AppError> {
        self.transition(AttemptStatus::Completed, now)?;

        let time_spent = (now - self.started_at).num_seconds().max(0);
        self.time_spent = Some(time_spent);
        self.recompute_results();
        Ok(time_spent)
    }

    /// Closes the attempt without rescoring; results stay as last submitted.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.transition(AttemptStatus::Abandoned, now)
    }

    fn transition(&mut self, next: AttemptStatus, now: DateTime<Utc>) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(attempt_not_found());
        }
        self.status = next;
        self.completed_at = Some(now);
        Ok(())
    }

    fn ensure_in_progress(&self) -> Result<(), AppError> {
        if self.status == AttemptStatus::InProgress {
            Ok(())
        } else {
            Err(attempt_not_found())
        }
    }
}

/// Data needed to persist a fresh attempt. The store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewQuizAttempt {
    pub student_id: i64,
    pub course_id: i64,
    pub lesson_id: i64,
    pub attempt_number: i32,
    pub started_at: DateTime<Utc>,
    pub total_questions: i32,
}

impl NewQuizAttempt {
    pub fn into_attempt(self, id: i64) -> QuizAttempt {
        QuizAttempt {
            id,
            student_id: self.student_id,
            course_id: self.course_id,
            lesson_id: self.lesson_id,
            attempt_number: self.attempt_number,
            status: AttemptStatus::InProgress,
            started_at: self.started_at,
            completed_at: None,
            time_spent: None,
            answers: Json(Vec::new()),
            results: QuizResults::new(self.total_questions, DEFAULT_PASSING_THRESHOLD),
            version: 0,
        }
    }
}

/// Rounded `100 * part / total`, or 0 for an empty quiz.
pub fn percentage(part: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (100.0 * part as f64 / total as f64).round() as i32
}

/// The single error used for "missing", "not yours" and "not in progress".
pub fn attempt_not_found() -> AppError {
    AppError::NotFound("Quiz attempt not found or no longer in progress".to_string())
}

/// DTO for starting (or resuming) a quiz.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartQuizRequest {
    #[validate(range(min = 1, message = "course_id must be a positive id"))]
    pub course_id: i64,
    #[validate(range(min = 1, message = "lesson_id must be a positive id"))]
    pub lesson_id: i64,
    #[validate(range(min = 0, max = 1000, message = "total_questions must be between 0 and 1000"))]
    pub total_questions: i32,
    #[serde(default)]
    pub allow_retakes: bool,
}

/// DTO for recording one answer.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(range(min = 1, message = "attempt_id must be a positive id"))]
    pub attempt_id: i64,
    #[validate(range(min = 0, message = "question_index must not be negative"))]
    pub question_index: i32,
    #[validate(custom(function = validate_selected_answer))]
    pub selected_answer: serde_json::Value,
    pub is_correct: bool,
}

fn validate_selected_answer(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return Err(ValidationError::new("selected_answer_required"));
    }
    Ok(())
}

/// DTO for complete / abandon.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttemptActionRequest {
    #[validate(range(min = 1, message = "attempt_id must be a positive id"))]
    pub attempt_id: i64,
}

/// Query parameters for the instructor attempt listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttemptListParams {
    pub lesson_id: Option<i64>,
    pub student_id: Option<i64>,
    pub status: Option<AttemptStatus>,
}

/// Response of the can-take check.
#[derive(Debug, Serialize)]
pub struct CanTakeResponse {
    pub can_take: bool,
    pub has_in_progress: bool,
    pub completed_attempt: Option<QuizAttempt>,
    pub in_progress_attempt: Option<QuizAttempt>,
}

/// Response after recording an answer.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub attempt: QuizAttempt,
    pub progress: QuizProgress,
    pub results: QuizResults,
}

/// Response after completing an attempt.
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub attempt: QuizAttempt,
    pub results: QuizResults,
    pub time_spent: i64,
}
