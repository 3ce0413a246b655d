//! Import handlers.

use axum::{
    extract::{Extension, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use utoipa::ToSchema;

use common::{AppError, AppResult};
use domain::Role;
use roster_service_lib::import::ImportReport;

use crate::extractors::ImportUpload;
use crate::middleware::{require_admin, CurrentUser};
use crate::state::AppState;

/// Multipart body of an import request
#[derive(ToSchema)]
pub struct ImportForm {
    /// CSV or XLSX file
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Password for the imported accounts (admin imports only, min 8 chars)
    #[schema(example = "rahasia-sekali")]
    pub password: Option<String>,
}

/// Create import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/:kind", post(import_roster))
        .route("/:kind/template", get(download_template))
}

/// Unknown kinds are treated as missing resources.
fn parse_kind(kind: &str) -> AppResult<Role> {
    kind.parse().map_err(|_| AppError::NotFound)
}

/// Import a roster spreadsheet (admin only)
#[utoipa::path(
    post,
    path = "/imports/{kind}",
    tag = "Imports",
    security(("bearer_auth" = [])),
    params(
        ("kind" = String, Path, description = "student, teacher, guardian or admin")
    ),
    request_body(content = ImportForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "Unreadable file or missing columns"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Not a CSV or XLSX file")
    )
)]
pub async fn import_roster(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    ImportUpload(upload): ImportUpload,
) -> AppResult<Json<ImportReport>> {
    require_admin(&current_user)?;
    let kind = parse_kind(&kind)?;

    tracing::info!(
        admin = %current_user.email,
        kind = %kind,
        size = upload.bytes.len(),
        "Import requested"
    );

    let report = state.roster.import(kind, upload).await?;
    Ok(Json(report))
}

/// Download the example CSV for an entity kind (admin only)
#[utoipa::path(
    get,
    path = "/imports/{kind}/template",
    tag = "Imports",
    security(("bearer_auth" = [])),
    params(
        ("kind" = String, Path, description = "student, teacher, guardian or admin")
    ),
    responses(
        (status = 200, description = "CSV template", body = String, content_type = "text/csv"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Unknown kind")
    )
)]
pub async fn download_template(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<Response> {
    require_admin(&current_user)?;
    let template = state.roster.template(parse_kind(&kind)?)?;

    let disposition = format!("attachment; filename=\"{}\"", template.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, template.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        template.bytes,
    )
        .into_response())
}
