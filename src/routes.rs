// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{instructor, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Student quiz routes under `/api/quiz`.
/// * Instructor reporting under `/api/instructor` (instructor role required).
/// * Every route requires a bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/can-take/{lesson_id}", get(quiz::can_take))
        .route("/start", post(quiz::start_quiz))
        .route("/answer", post(quiz::submit_answer))
        .route("/complete", post(quiz::complete_quiz))
        .route("/abandon", post(quiz::abandon_quiz))
        .route("/current/{lesson_id}", get(quiz::current_attempt))
        .route("/completed/{lesson_id}", get(quiz::completed_attempt))
        .route("/best/{lesson_id}", get(quiz::best_attempt))
        .route("/history/{lesson_id}", get(quiz::attempt_history))
        .route("/stats/{course_id}", get(quiz::my_course_stats));

    let instructor_routes = Router::new()
        .route(
            "/courses/{course_id}/quiz-stats",
            get(instructor::course_quiz_stats),
        )
        .route(
            "/courses/{course_id}/attempts",
            get(instructor::list_course_attempts),
        )
        .layer(middleware::from_fn(instructor_middleware));

    // Auth runs before every nested route, including the instructor check.
    let api_routes = Router::new()
        .nest("/quiz", quiz_routes)
        .nest("/instructor", instructor_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::Config,
        store::MemoryAttemptStore,
        utils::jwt::{ROLE_ADMIN, ROLE_STUDENT, sign_jwt},
    };

    const SECRET: &str = "router_test_secret";

    fn app() -> Router {
        let config = Config {
            database_url: None,
            jwt_secret: SECRET.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            log_dir: "logs".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string(), "not a valid origin\n".to_string()],
        };
        create_router(AppState::new(Arc::new(MemoryAttemptStore::new()), config))
    }

    fn get(uri: &str, role: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(role) = role {
            let token = sign_jwt(12, role, SECRET, 600).unwrap();
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_token_gets_json_401() {
        let response = app().oneshot(get("/api/quiz/current/1", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn students_are_kept_out_of_instructor_routes() {
        let response = app()
            .oneshot(get("/api/instructor/courses/1/quiz-stats", Some(ROLE_STUDENT)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app()
            .oneshot(get("/api/instructor/courses/1/quiz-stats", Some(ROLE_ADMIN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_lookups_return_null_data() {
        let response = app()
            .oneshot(get("/api/quiz/best/77", Some(ROLE_STUDENT)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true, "data": null }));
    }
}
