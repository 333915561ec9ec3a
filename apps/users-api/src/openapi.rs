//! OpenAPI documentation configuration

use utoipa::{Modify, OpenApi};

use crate::api;

/// Folds the users domain document into the application document.
///
/// Domain routes are mounted at the root, so their paths are merged as-is.
struct DomainApis;

impl Modify for DomainApis {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.merge(domain_users::ApiDoc::openapi());
    }
}

/// Combined OpenAPI documentation for all APIs
#[derive(OpenApi)]
#[openapi(
    modifiers(&DomainApis),
    info(
        title = "Users API",
        version = "0.1.0",
        description = "MongoDB-backed REST API for managing users",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        api::root::root,
        api::items::list_items,
        api::health::readiness_check,
    ),
    components(schemas(api::items::ItemSummary)),
    tags(
        (name = "Root", description = "Service greeting"),
        (name = "Items", description = "Static sample listing"),
        (name = "Health", description = "Readiness probe")
    )
)]
pub struct ApiDoc;
