//! HTTP routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use delver_domain::{SceneId, SceneRecord};

use crate::app::App;
use crate::use_cases::illustration::IllustrationStatus;
use crate::use_cases::scene::{PlayerInput, SceneError};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/game", get(current_scene))
        .route("/api/game/advance", post(advance))
        .route("/api/game/reset", post(reset))
        .route("/api/images/{scene_id}", get(poll_image))
}

async fn health() -> &'static str {
    "OK"
}

/// One turn of player input: a numbered choice or free text.
#[derive(Debug, Deserialize)]
struct AdvanceRequest {
    choice: Option<u32>,
    text: Option<String>,
}

/// Current scene, narrating the opening first if the session is fresh.
async fn current_scene(State(app): State<Arc<App>>) -> Result<Json<SceneRecord>, ApiError> {
    let mut session = app.session.lock().await;
    if let Some(scene) = app.engine.current_scene(&session) {
        return Ok(Json(scene));
    }
    let scene = app.engine.reset(&mut session).await?;
    Ok(Json(scene))
}

async fn advance(
    State(app): State<Arc<App>>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<SceneRecord>, ApiError> {
    let input = match (request.choice, request.text) {
        (Some(number), _) => PlayerInput::Choice(number),
        (None, Some(text)) if !text.trim().is_empty() => PlayerInput::FreeText(text),
        _ => {
            return Err(ApiError::BadRequest(
                "provide either a choice number or non-empty text".to_string(),
            ))
        }
    };

    let mut session = app.session.lock().await;
    match app.engine.advance(&mut session, input).await {
        Ok(scene) => Ok(Json(scene)),
        // Recovered locally: an invalid choice is a scene of its own, with
        // no options and no history mutation behind it.
        Err(SceneError::InvalidChoice(number)) => {
            tracing::debug!(number, "invalid choice");
            Ok(Json(SceneRecord {
                scene_text: "Invalid choice!".to_string(),
                options: BTreeMap::new(),
                player_status: session.player.status_line(),
                scene_id: session.current_scene_id(),
            }))
        }
        Err(err @ SceneError::Backend(_)) => Err(err.into()),
    }
}

async fn reset(State(app): State<Arc<App>>) -> Result<Json<SceneRecord>, ApiError> {
    let mut session = app.session.lock().await;
    let scene = app.engine.reset(&mut session).await?;
    Ok(Json(scene))
}

async fn poll_image(
    State(app): State<Arc<App>>,
    Path(scene_id): Path<String>,
) -> Result<Json<IllustrationStatus>, ApiError> {
    let scene_id: SceneId = scene_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid scene id: {scene_id}")))?;
    Ok(Json(app.illustrations.poll(scene_id)))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Upstream(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::BadRequest(msg) => {
                (axum::http::StatusCode::BAD_REQUEST, msg).into_response()
            }
            ApiError::Upstream(_) => (
                axum::http::StatusCode::BAD_GATEWAY,
                "Chat backend unavailable",
            )
                .into_response(),
        }
    }
}

impl From<SceneError> for ApiError {
    fn from(e: SceneError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::infrastructure::image_store::ImageStore;
    use crate::infrastructure::ports::{
        ImageGenError, ImageGenPort, ImageRequest, ImageResult, LlmError, LlmPort, LlmRequest,
        LlmResponse,
    };
    use delver_domain::Turn;

    struct FixedLlm(String);

    #[async_trait]
    impl LlmPort for FixedLlm {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                content: self.0.clone(),
            })
        }
    }

    struct NoopImageGen;

    #[async_trait]
    impl ImageGenPort for NoopImageGen {
        async fn generate(&self, _request: ImageRequest) -> Result<ImageResult, ImageGenError> {
            Err(ImageGenError::Unavailable)
        }

        async fn check_health(&self) -> Result<bool, ImageGenError> {
            Ok(false)
        }
    }

    fn test_app(reply: &str, dir: &tempfile::TempDir) -> Arc<App> {
        Arc::new(App::new(
            Arc::new(FixedLlm(reply.to_string())),
            Arc::new(NoopImageGen),
            ImageStore::new(dir.path()),
            6,
        ))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn advance_returns_the_new_scene() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app("You press on.\n1. Continue", &dir);
        {
            let mut session = app.session.lock().await;
            session.history.append(Turn::system("sys"));
            session.history.append(Turn::assistant("1. Go"));
        }

        let response = routes()
            .with_state(app)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/game/advance")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"choice": 1}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["scene_text"], "You press on.");
        assert_eq!(json["options"]["1"], "Continue");
        assert_eq!(json["scene_id"], "scene-4");
    }

    #[tokio::test]
    async fn invalid_choice_is_a_recoverable_scene() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app("unused", &dir);
        {
            let mut session = app.session.lock().await;
            session.history.append(Turn::system("sys"));
            session.history.append(Turn::assistant("1. Go"));
        }

        let response = routes()
            .with_state(app.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/game/advance")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"choice": 7}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["scene_text"], "Invalid choice!");
        assert_eq!(json["options"], serde_json::json!({}));
        assert_eq!(app.session.lock().await.history.len(), 2);
    }

    #[tokio::test]
    async fn advance_without_input_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app("unused", &dir);

        let response = routes()
            .with_state(app)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/game/advance")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text": "  "}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn image_poll_reports_not_ready_for_unknown_scene() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app("unused", &dir);

        let response = routes()
            .with_state(app)
            .oneshot(
                Request::builder()
                    .uri("/api/images/scene-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ready"], false);
        assert_eq!(json["reference"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn image_poll_rejects_malformed_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app("unused", &dir);

        let response = routes()
            .with_state(app)
            .oneshot(
                Request::builder()
                    .uri("/api/images/not-a-scene")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reset_narrates_a_fresh_opening() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app("The gate looms.\n1. Enter\n2. Wait\n3. Flee", &dir);

        let response = routes()
            .with_state(app.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/game/reset")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["scene_text"], "The gate looms.");
        assert_eq!(app.session.lock().await.history.len(), 3);
    }
}
