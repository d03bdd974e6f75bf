// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        quiz_attempt::{AttemptActionRequest, StartQuizRequest, SubmitAnswerRequest},
        response::ok,
    },
    services::quiz_attempts::QuizAttemptManager,
    utils::jwt::Claims,
};

/// Reports whether the caller may start or resume the lesson's quiz.
pub async fn can_take(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    lesson_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(lesson_id) = lesson_id?;
    let result = attempts.can_take(claims.user_id()?, lesson_id).await?;
    Ok(ok(result))
}

/// Starts a quiz attempt, or resumes the open one.
///
/// * 201 Created when a new attempt was opened.
/// * 200 OK when an in-progress attempt was resumed.
/// * 403 Forbidden when the quiz was completed and retakes are off.
pub async fn start_quiz(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<StartQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let outcome = attempts.start(claims.user_id()?, &req).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, ok(outcome.attempt)))
}

/// Records an answer for one question.
/// Correctness is computed by the client and stored as given.
pub async fn submit_answer(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = attempts.submit_answer(claims.user_id()?, req).await?;
    Ok(ok(result))
}

pub async fn complete_quiz(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<AttemptActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = attempts.complete(claims.user_id()?, req.attempt_id).await?;
    Ok(ok(result))
}

pub async fn abandon_quiz(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<AttemptActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let attempt = attempts.abandon(claims.user_id()?, req.attempt_id).await?;
    Ok(ok(attempt))
}

/// The caller's in-progress attempt for a lesson, or `null`.
pub async fn current_attempt(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    lesson_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(lesson_id) = lesson_id?;
    let attempt = attempts.current(claims.user_id()?, lesson_id).await?;
    Ok(ok(attempt))
}

/// The caller's most recent completed attempt for a lesson, or `null`.
pub async fn completed_attempt(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    lesson_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(lesson_id) = lesson_id?;
    let attempt = attempts.latest_completed(claims.user_id()?, lesson_id).await?;
    Ok(ok(attempt))
}

pub async fn best_attempt(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    lesson_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(lesson_id) = lesson_id?;
    let attempt = attempts.best_attempt(claims.user_id()?, lesson_id).await?;
    Ok(ok(attempt))
}

pub async fn attempt_history(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    lesson_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(lesson_id) = lesson_id?;
    let history = attempts.history(claims.user_id()?, lesson_id).await?;
    Ok(ok(history))
}

/// Per-lesson quiz summary of the caller within a course.
pub async fn my_course_stats(
    State(attempts): State<QuizAttemptManager>,
    Extension(claims): Extension<Claims>,
    course_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(course_id) = course_id?;
    let stats = attempts.student_course_stats(claims.user_id()?, course_id).await?;
    Ok(ok(stats))
}
