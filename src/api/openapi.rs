//! OpenAPI documentation for the dashboard's JSON endpoints.

use utoipa::OpenApi;

/// OpenAPI document covering the JSON surface of the dashboard API.
/// HTML pages, the WebSocket endpoint, and static assets are not part of
/// the documented surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "telegram-dl dashboard API",
        description = "File listing and management endpoints of the telegram-dl dashboard",
        license(name = "MIT OR Apache-2.0")
    ),
    paths(
        crate::api::routes::list_downloads,
        crate::api::routes::delete_download,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::FileEntry,
        crate::types::FileKind,
        crate::types::Event,
    )),
    tags(
        (name = "files", description = "Stored file management"),
        (name = "system", description = "Health and documentation")
    )
)]
pub struct ApiDoc;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi as _;

    #[test]
    fn spec_contains_documented_paths() {
        let spec = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = spec["paths"].as_object().unwrap();

        assert!(paths.contains_key("/downloads"));
        assert!(paths.contains_key("/downloads/{name}"));
        assert!(paths.contains_key("/health"));
    }

    #[test]
    fn spec_contains_core_schemas() {
        let spec = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let schemas = spec["components"]["schemas"].as_object().unwrap();

        assert!(schemas.contains_key("FileEntry"));
        assert!(schemas.contains_key("FileKind"));
        assert!(schemas.contains_key("Event"));
    }
}
