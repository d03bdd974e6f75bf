// src/services/quiz_attempts.rs

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        quiz_attempt::{
            AnswerResponse, AttemptListParams, AttemptStatus, CanTakeResponse,
            CompletionResponse, NewQuizAttempt, QuizAttempt, StartQuizRequest,
            SubmitAnswerRequest, attempt_not_found, percentage,
        },
        stats::{CourseQuizStats, LessonQuizStats, LessonQuizSummary, StudentCourseStats},
    },
    store::{AttemptFilter, AttemptStore},
};

/// Result of `start`: the attempt and whether it was freshly created.
#[derive(Debug)]
pub struct StartOutcome {
    pub attempt: QuizAttempt,
    pub created: bool,
}

/// Owns the attempt lifecycle: start or resume, answer, complete, abandon.
///
/// All state lives in the injected store; the manager itself is cheap to clone.
#[derive(Clone)]
pub struct QuizAttemptManager {
    store: Arc<dyn AttemptStore>,
}

impl QuizAttemptManager {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self { store }
    }

    /// Whether the student may begin (or resume) the lesson's quiz.
    /// Ignores `allow_retakes`; that gate lives in `start`.
    pub async fn can_take(&self, student_id: i64, lesson_id: i64) -> Result<CanTakeResponse, AppError> {
        let filter = AttemptFilter::student_lesson(student_id, lesson_id);
        let completed_attempt = self
            .store
            .find_one(&filter.with_status(AttemptStatus::Completed))
            .await?;
        let in_progress_attempt = self
            .store
            .find_one(&filter.with_status(AttemptStatus::InProgress))
            .await?;

        Ok(CanTakeResponse {
            can_take: completed_attempt.is_none(),
            has_in_progress: in_progress_attempt.is_some(),
            completed_attempt,
            in_progress_attempt,
        })
    }

    /// Starts a new attempt, or hands back the open one.
    pub async fn start(&self, student_id: i64, req: &StartQuizRequest) -> Result<StartOutcome, AppError> {
        let filter = AttemptFilter::student_lesson(student_id, req.lesson_id);

        if !req.allow_retakes
            && self
                .store
                .find_one(&filter.with_status(AttemptStatus::Completed))
                .await?
                .is_some()
        {
            return Err(AppError::Forbidden(
                "Quiz already completed and retakes are not allowed".to_string(),
            ));
        }

        if let Some(open) = self.current(student_id, req.lesson_id).await? {
            tracing::info!(attempt_id = open.id, student_id, lesson_id = req.lesson_id, "Resuming quiz attempt");
            return Ok(StartOutcome {
                attempt: open,
                created: false,
            });
        }

        let attempt_number = self.store.count(&filter).await? as i32 + 1;
        let new_attempt = NewQuizAttempt {
            student_id,
            course_id: req.course_id,
            lesson_id: req.lesson_id,
            attempt_number,
            started_at: Utc::now(),
            total_questions: req.total_questions,
        };

        match self.store.insert(new_attempt).await {
            Ok(attempt) => {
                tracing::info!(
                    attempt_id = attempt.id,
                    student_id,
                    lesson_id = req.lesson_id,
                    attempt_number,
                    "Quiz attempt started"
                );
                Ok(StartOutcome {
                    attempt,
                    created: true,
                })
            }
            // A concurrent start won the race; resume whatever it opened.
            Err(AppError::Conflict(msg)) => match self.current(student_id, req.lesson_id).await? {
                Some(open) => Ok(StartOutcome {
                    attempt: open,
                    created: false,
                }),
                None => Err(AppError::Conflict(msg)),
            },
            Err(e) => Err(e),
        }
    }

    /// Records (or replaces) the answer for one question and rescores.
    pub async fn submit_answer(
        &self,
        student_id: i64,
        req: SubmitAnswerRequest,
    ) -> Result<AnswerResponse, AppError> {
        let mut attempt = self.load_open(student_id, req.attempt_id).await?;

        if req.question_index >= attempt.results.total_questions {
            return Err(AppError::BadRequest(format!(
                "question_index {} is out of range for a quiz with {} questions",
                req.question_index, attempt.results.total_questions
            )));
        }

        attempt.record_answer(req.question_index, req.selected_answer, req.is_correct, Utc::now())?;
        let attempt = self.persist(&attempt).await?;

        Ok(AnswerResponse {
            progress: attempt.progress(),
            results: attempt.results.clone(),
            attempt,
        })
    }

    /// Finalizes the attempt with its score and elapsed time.
    pub async fn complete(&self, student_id: i64, attempt_id: i64) -> Result<CompletionResponse, AppError> {
        let mut attempt = self.load_open(student_id, attempt_id).await?;
        let time_spent = attempt.complete(Utc::now())?;
        let attempt = self.persist(&attempt).await?;

        tracing::info!(
            attempt_id,
            student_id,
            score = attempt.results.score,
            passed = attempt.results.passed,
            "Quiz attempt completed"
        );

        Ok(CompletionResponse {
            results: attempt.results.clone(),
            time_spent,
            attempt,
        })
    }

    /// Closes the attempt; results stay frozen at the last answer.
    pub async fn abandon(&self, student_id: i64, attempt_id: i64) -> Result<QuizAttempt, AppError> {
        let mut attempt = self.load_open(student_id, attempt_id).await?;
        attempt.abandon(Utc::now())?;
        let attempt = self.persist(&attempt).await?;

        tracing::info!(attempt_id, student_id, "Quiz attempt abandoned");
        Ok(attempt)
    }

    pub async fn current(&self, student_id: i64, lesson_id: i64) -> Result<Option<QuizAttempt>, AppError> {
        self.store
            .find_one(&AttemptFilter::student_lesson(student_id, lesson_id).with_status(AttemptStatus::InProgress))
            .await
    }

    pub async fn latest_completed(&self, student_id: i64, lesson_id: i64) -> Result<Option<QuizAttempt>, AppError> {
        self.store
            .find_one(&AttemptFilter::student_lesson(student_id, lesson_id).with_status(AttemptStatus::Completed))
            .await
    }

    /// Highest-scoring completed attempt; ties go to more correct answers.
    pub async fn best_attempt(&self, student_id: i64, lesson_id: i64) -> Result<Option<QuizAttempt>, AppError> {
        let completed = self
            .store
            .find_many(&AttemptFilter::student_lesson(student_id, lesson_id).with_status(AttemptStatus::Completed))
            .await?;

        Ok(best_of(&completed).cloned())
    }

    /// Every attempt at the lesson, newest first.
    pub async fn history(&self, student_id: i64, lesson_id: i64) -> Result<Vec<QuizAttempt>, AppError> {
        self.store
            .find_many(&AttemptFilter::student_lesson(student_id, lesson_id))
            .await
    }

    pub async fn student_course_stats(&self, student_id: i64, course_id: i64) -> Result<StudentCourseStats, AppError> {
        let filter = AttemptFilter {
            student_id: Some(student_id),
            ..AttemptFilter::course(course_id)
        };
        let attempts = self.store.find_many(&filter).await?;
        Ok(summarize_student(course_id, &attempts))
    }

    pub async fn course_stats(&self, course_id: i64) -> Result<CourseQuizStats, AppError> {
        let attempts = self.store.find_many(&AttemptFilter::course(course_id)).await?;
        Ok(summarize_course(course_id, &attempts))
    }

    pub async fn course_attempts(
        &self,
        course_id: i64,
        params: &AttemptListParams,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let filter = AttemptFilter {
            lesson_id: params.lesson_id,
            student_id: params.student_id,
            status: params.status,
            ..AttemptFilter::course(course_id)
        };
        self.store.find_many(&filter).await
    }

    async fn load_open(&self, student_id: i64, attempt_id: i64) -> Result<QuizAttempt, AppError> {
        self.store
            .find_one(&AttemptFilter::owned(attempt_id, student_id).with_status(AttemptStatus::InProgress))
            .await?
            .ok_or_else(attempt_not_found)
    }

    /// Writes back through the store's compare-and-swap and explains a miss.
    async fn persist(&self, attempt: &QuizAttempt) -> Result<QuizAttempt, AppError> {
        if let Some(stored) = self.store.update(attempt).await? {
            return Ok(stored);
        }

        let still_open = self
            .store
            .find_one(
                &AttemptFilter::owned(attempt.id, attempt.student_id).with_status(AttemptStatus::InProgress),
            )
            .await?;

        match still_open {
            Some(_) => Err(AppError::Conflict(
                "Quiz attempt was modified concurrently, please retry".to_string(),
            )),
            None => Err(attempt_not_found()),
        }
    }
}

/// Completed attempt with the highest score, then the most correct answers.
pub fn best_of(attempts: &[QuizAttempt]) -> Option<&QuizAttempt> {
    attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .max_by_key(|a| (a.results.score, a.results.correct_answers))
}

fn rounded_mean(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    (sum as f64 / values.len() as f64).round() as i32
}

fn by_lesson(attempts: &[QuizAttempt]) -> BTreeMap<i64, Vec<QuizAttempt>> {
    let mut lessons: BTreeMap<i64, Vec<QuizAttempt>> = BTreeMap::new();
    for attempt in attempts {
        lessons.entry(attempt.lesson_id).or_default().push(attempt.clone());
    }
    lessons
}

fn count_status(attempts: &[QuizAttempt], status: AttemptStatus) -> i64 {
    attempts.iter().filter(|a| a.status == status).count() as i64
}

fn unique_students(attempts: &[QuizAttempt]) -> i64 {
    attempts.iter().map(|a| a.student_id).collect::<HashSet<_>>().len() as i64
}

/// Average score and pass rate over completed attempts only.
fn completed_scores(attempts: &[QuizAttempt]) -> (i32, i32) {
    let completed: Vec<&QuizAttempt> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .collect();
    let scores: Vec<i32> = completed.iter().map(|a| a.results.score).collect();
    let passed = completed.iter().filter(|a| a.results.passed).count() as i32;
    (rounded_mean(&scores), percentage(passed, completed.len() as i32))
}

pub fn summarize_student(course_id: i64, attempts: &[QuizAttempt]) -> StudentCourseStats {
    let lessons: Vec<LessonQuizSummary> = by_lesson(attempts)
        .into_iter()
        .map(|(lesson_id, lesson_attempts)| {
            let best = best_of(&lesson_attempts);
            LessonQuizSummary {
                lesson_id,
                attempts: lesson_attempts.len() as i64,
                best_score: best.map(|a| a.results.score),
                passed: best.is_some_and(|a| a.results.passed),
                has_in_progress: lesson_attempts
                    .iter()
                    .any(|a| a.status == AttemptStatus::InProgress),
            }
        })
        .collect();

    let best_scores: Vec<i32> = lessons.iter().filter_map(|l| l.best_score).collect();

    StudentCourseStats {
        course_id,
        total_attempts: attempts.len() as i64,
        completed_attempts: count_status(attempts, AttemptStatus::Completed),
        lessons_attempted: lessons.len() as i64,
        lessons_passed: lessons.iter().filter(|l| l.passed).count() as i64,
        average_best_score: rounded_mean(&best_scores),
        lessons,
    }
}

pub fn summarize_course(course_id: i64, attempts: &[QuizAttempt]) -> CourseQuizStats {
    let lessons = by_lesson(attempts)
        .into_iter()
        .map(|(lesson_id, lesson_attempts)| {
            let (average_score, pass_rate) = completed_scores(&lesson_attempts);
            LessonQuizStats {
                lesson_id,
                attempts: lesson_attempts.len() as i64,
                completed_attempts: count_status(&lesson_attempts, AttemptStatus::Completed),
                unique_students: unique_students(&lesson_attempts),
                average_score,
                pass_rate,
            }
        })
        .collect();

    let (average_score, pass_rate) = completed_scores(attempts);

    CourseQuizStats {
        course_id,
        total_attempts: attempts.len() as i64,
        completed_attempts: count_status(attempts, AttemptStatus::Completed),
        in_progress_attempts: count_status(attempts, AttemptStatus::InProgress),
        abandoned_attempts: count_status(attempts, AttemptStatus::Abandoned),
        unique_students: unique_students(attempts),
        average_score,
        pass_rate,
        lessons,
    }
}
