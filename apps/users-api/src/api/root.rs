use axum::{Json, Router, routing::get};
use domain_users::MessageResponse;

pub const WELCOME_MESSAGE: &str = "Welcome to the Fast API with MongoDB !";

pub fn router() -> Router {
    Router::new().route("/", get(root))
}

/// Welcome message
#[utoipa::path(
    get,
    path = "/",
    tag = "Root",
    responses(
        (status = 200, description = "Service greeting", body = MessageResponse)
    )
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new(WELCOME_MESSAGE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_returns_welcome_message() {
        let response = router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: MessageResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, WELCOME_MESSAGE);
    }
}
