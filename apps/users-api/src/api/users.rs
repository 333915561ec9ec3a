//! Wires the users domain to the configured collection.

use axum::Router;
use domain_users::{MongoUserRepository, UserService, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let repository =
        MongoUserRepository::with_collection(&state.db, state.config.mongodb.collection());
    let service = UserService::new(repository);

    handlers::router(service)
}
