use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, describe_validation_errors};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("No user found")]
    NotFound,

    #[error("{}", describe_validation_errors(.0))]
    Validation(#[from] ValidationErrors),

    /// The insert succeeded but the new document could not be read back
    #[error("Failed to create user")]
    CreationInconsistency,

    #[error("Projection failed: {0}")]
    Projection(String),

    #[error("{0}")]
    Database(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::Validation(errors) => AppError::ValidationError(errors),
            UserError::CreationInconsistency => AppError::InternalServerError(err.to_string()),
            UserError::Projection(_) => AppError::Decode(err.to_string()),
            UserError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for UserError {
    fn from(err: mongodb::error::Error) -> Self {
        UserError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for UserError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        UserError::Database(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for UserError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        UserError::Projection(err.to_string())
    }
}
