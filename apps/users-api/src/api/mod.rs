//! HTTP routes of the users API.
//!
//! Everything is mounted at the root; `/health` is merged in `main`.

pub mod health;
pub mod items;
pub mod root;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub fn routes(state: &AppState) -> Router {
    Router::new()
        .merge(root::router())
        .merge(items::router())
        .merge(users::router(state))
        .merge(health::router(state.clone()))
}
