// src/models/stats.rs

use serde::Serialize;

/// A student's quiz summary for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonQuizSummary {
    pub lesson_id: i64,
    pub attempts: i64,
    /// Best completed score, if any attempt was completed.
    pub best_score: Option<i32>,
    pub passed: bool,
    pub has_in_progress: bool,
}

/// A student's quiz summary across a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentCourseStats {
    pub course_id: i64,
    pub total_attempts: i64,
    pub completed_attempts: i64,
    pub lessons_attempted: i64,
    pub lessons_passed: i64,
    pub average_best_score: i32,
    pub lessons: Vec<LessonQuizSummary>,
}

/// Instructor view of one lesson's quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonQuizStats {
    pub lesson_id: i64,
    pub attempts: i64,
    pub completed_attempts: i64,
    pub unique_students: i64,
    pub average_score: i32,
    pub pass_rate: i32,
}

/// Instructor view of every quiz in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseQuizStats {
    pub course_id: i64,
    pub total_attempts: i64,
    pub completed_attempts: i64,
    pub in_progress_attempts: i64,
    pub abandoned_attempts: i64,
    pub unique_students: i64,
    pub average_score: i32,
    pub pass_rate: i32,
    pub lessons: Vec<LessonQuizStats>,
}
