//! Static sample listing, independent of the database.

use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemSummary {
    pub username: String,
}

const SAMPLE_USERNAMES: [&str; 2] = ["Alice", "Bob"];

pub fn router() -> Router {
    Router::new()
        .route("/items/", get(list_items))
        .route("/items", get(list_items))
}

/// Fixed sample list
#[utoipa::path(
    get,
    path = "/items/",
    tag = "Items",
    responses(
        (status = 200, description = "Sample items", body = Vec<ItemSummary>)
    )
)]
pub async fn list_items() -> Json<Vec<ItemSummary>> {
    Json(
        SAMPLE_USERNAMES
            .iter()
            .map(|username| ItemSummary {
                username: username.to_string(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_items_are_static() {
        for uri in ["/items/", "/items"] {
            let response = router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, json!([{ "username": "Alice" }, { "username": "Bob" }]));
        }
    }
}
