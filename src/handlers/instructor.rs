// src/handlers/instructor.rs

use axum::{
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{quiz_attempt::AttemptListParams, response::ok},
    services::quiz_attempts::QuizAttemptManager,
};

/// Aggregate quiz statistics for every lesson in a course.
/// Instructor only.
pub async fn course_quiz_stats(
    State(attempts): State<QuizAttemptManager>,
    course_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(course_id) = course_id?;
    let stats = attempts.course_stats(course_id).await?;
    Ok(ok(stats))
}

/// Lists attempts in a course, newest first.
/// Optional filters: `lesson_id`, `student_id`, `status`.
/// Instructor only.
pub async fn list_course_attempts(
    State(attempts): State<QuizAttemptManager>,
    course_id: Result<Path<i64>, PathRejection>,
    params: Result<Query<AttemptListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(course_id) = course_id?;
    let Query(params) = params?;
    let list = attempts.course_attempts(course_id, &params).await?;
    Ok(ok(list))
}
