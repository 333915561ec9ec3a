use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    ValidatedJson,
    errors::responses::{InternalServerErrorResponse, NotFoundResponse, ValidationErrorResponse},
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::models::{CreateUser, MessageResponse, Role, UserResponse, UserView};
use crate::repository::UserRepository;
use crate::service::UserService;

#[derive(OpenApi)]
#[openapi(
    paths(create_user, list_users, search_users, delete_user),
    components(
        schemas(CreateUser, UserView, UserResponse, MessageResponse, Role),
        responses(
            NotFoundResponse,
            ValidationErrorResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Users", description = "User management endpoints (MongoDB)")
    )
)]
pub struct ApiDoc;

/// Users router. Both `/users` and `/users/` serve the collection.
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{key}", get(search_users).delete(delete_user))
        .with_state(shared_service)
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users/",
    tag = "Users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserView),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users/",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> UserResult<Json<Vec<UserResponse>>> {
    let users = service.list_users().await?;
    Ok(Json(users))
}

/// Find users by exact email or username
#[utoipa::path(
    get,
    path = "/users/{search}",
    tag = "Users",
    params(
        ("search" = String, Path, description = "Email or username to match exactly")
    ),
    responses(
        (status = 200, description = "Matching users", body = Vec<UserResponse>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(search): Path<String>,
) -> UserResult<Json<Vec<UserResponse>>> {
    let users = service.search_users(&search).await?;
    Ok(Json(users))
}

/// Delete a user by email
#[utoipa::path(
    delete,
    path = "/users/{email}",
    tag = "Users",
    params(
        ("email" = String, Path, description = "Email of the user to delete")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(email): Path<String>,
) -> UserResult<Json<MessageResponse>> {
    let message = service.delete_user(&email).await?;
    Ok(Json(MessageResponse::new(message)))
}
