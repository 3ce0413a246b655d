//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers::import_handler::ImportForm;
use domain::Role;
use roster_service_lib::import::{ImportReport, RowFailure};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::import_handler::import_roster,
        crate::handlers::import_handler::download_template,
    ),
    components(
        schemas(
            ImportForm,
            ImportReport,
            RowFailure,
            Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Imports", description = "Bulk roster import endpoints"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_import_paths() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/imports/{kind}"));
        assert!(doc.paths.paths.contains_key("/imports/{kind}/template"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
