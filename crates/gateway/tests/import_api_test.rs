//! Integration tests for the import API.
//!
//! The router runs in-process via `tower::ServiceExt::oneshot`, backed either
//! by the real roster service over an in-memory store or by a mockall mock.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use common::{ImportConfig, JwtConfig};
use domain::Role;
use gateway_lib::config::GatewayConfig;
use gateway_lib::middleware::issue_token;
use gateway_lib::routes::create_router;
use gateway_lib::state::AppState;
use roster_service_lib::import::ImportReport;
use roster_service_lib::repository::MemoryRoster;
use roster_service_lib::service::{MockRosterService, RosterManager, RosterService};

const BOUNDARY: &str = "roster-test-boundary";

const STUDENT_CSV: &str = "name,email,nis,birth_date,phone,address,guardian_emails,guardian_name,\
guardian_email,guardian_phone,guardian_address,guardian_relation\n\
Ahmad,ahmad@x.com,,2012-01-01,,,,Budi,budi@x.com,0812,,ayah\n\
Fatimah,fatimah@x.com,,2011-05-02,,,,,,,,\n";

// =============================================================================
// Test Helpers
// =============================================================================

fn config() -> GatewayConfig {
    GatewayConfig {
        jwt: JwtConfig {
            secret: "test-secret-key-minimum-32-chars!!".to_string(),
            expiration_hours: 1,
        },
        ..Default::default()
    }
}

fn app_with(roster: Arc<dyn RosterService>, config: GatewayConfig) -> Router {
    create_router(AppState::new(roster, config))
}

fn memory_app() -> (Arc<MemoryRoster>, Router) {
    let store = Arc::new(MemoryRoster::new());
    let service = Arc::new(RosterManager::new(store.clone(), ImportConfig::default()));
    (store, app_with(service, config()))
}

fn token(role: Role) -> String {
    issue_token(&config().jwt, Uuid::new_v4(), "tu@x.com", role).unwrap()
}

fn multipart(file: Option<(&str, &str, &[u8])>, password: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(password) = password {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\n{}\r\n",
                BOUNDARY, password
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn import_request(kind: &str, bearer: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/imports/{}", kind))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

fn csv_file(name: &str, text: &str) -> Vec<u8> {
    multipart(Some((name, "text/csv", text.as_bytes())), None)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_import_without_token_is_unauthorized() {
    let (_, app) = memory_app();

    let response = app
        .oneshot(import_request("student", None, csv_file("santri.csv", STUDENT_CSV)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_import_with_forged_token_is_unauthorized() {
    let (_, app) = memory_app();

    let response = app
        .oneshot(import_request(
            "student",
            Some("not-a-jwt"),
            csv_file("santri.csv", STUDENT_CSV),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_import_by_teacher_is_forbidden() {
    let (store, app) = memory_app();

    let response = app
        .oneshot(import_request(
            "student",
            Some(&token(Role::Teacher)),
            csv_file("santri.csv", STUDENT_CSV),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(store.accounts().is_empty());
}

// =============================================================================
// Imports
// =============================================================================

#[tokio::test]
async fn test_admin_import_returns_report() {
    let (store, app) = memory_app();

    let response = app
        .oneshot(import_request(
            "student",
            Some(&token(Role::Admin)),
            csv_file("santri.csv", STUDENT_CSV),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["created"], 2);
    assert_eq!(body["guardiansCreated"], 1);
    assert_eq!(body["guardiansLinked"], 1);
    assert_eq!(
        body["message"],
        "2 santri baru, 0 diperbarui, 1 relasi ditambahkan, 1 wali baru"
    );
    assert!(store.account_by_email("fatimah@x.com").is_some());
}

#[tokio::test]
async fn test_row_failures_are_reported_with_200() {
    let (_, app) = memory_app();
    let csv = "name,email\nHasan,bukan-email\nUmar,umar@x.com\n";

    let response = app
        .oneshot(import_request(
            "guru",
            Some(&token(Role::Admin)),
            csv_file("guru.csv", csv),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["created"], 1);
    assert_eq!(body["failures"][0]["row"], 2);
    assert_eq!(body["failures"][0]["attribute"], "email");
}

#[tokio::test]
async fn test_unknown_kind_is_not_found() {
    let (_, app) = memory_app();

    let response = app
        .oneshot(import_request(
            "alumni",
            Some(&token(Role::Admin)),
            csv_file("alumni.csv", "name\nAhmad\n"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_file_field_is_bad_request() {
    let (_, app) = memory_app();

    let response = app
        .oneshot(import_request(
            "student",
            Some(&token(Role::Admin)),
            multipart(None, None),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_file_is_415() {
    let (_, app) = memory_app();
    let body = multipart(Some(("foto.png", "image/png", b"\x89PNG\r\n\x1a\n")), None);

    let response = app
        .oneshot(import_request("student", Some(&token(Role::Admin)), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");
}

#[tokio::test]
async fn test_file_over_kind_cap_is_413() {
    let (_, app) = memory_app();
    let bytes = vec![b'a'; 2 * 1024 * 1024 + 1];
    let body = multipart(Some(("guru.csv", "text/csv", &bytes)), None);

    let response = app
        .oneshot(import_request("teacher", Some(&token(Role::Admin)), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_body_over_gateway_limit_is_413() {
    let store = Arc::new(MemoryRoster::new());
    let service = Arc::new(RosterManager::new(store, ImportConfig::default()));
    let app = app_with(
        service,
        GatewayConfig {
            max_body_bytes: 1024,
            ..config()
        },
    );
    let bytes = vec![b'a'; 8 * 1024];
    let body = multipart(Some(("guru.csv", "text/csv", &bytes)), None);

    let response = app
        .oneshot(import_request("teacher", Some(&token(Role::Admin)), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_admin_import_needs_password() {
    let (store, app) = memory_app();

    let response = app
        .oneshot(import_request(
            "admin",
            Some(&token(Role::Admin)),
            csv_file("admin.csv", "name,email\nAdmin TU,tu@x.com\n"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["message"], "Password wajib diisi untuk impor admin");
    assert!(store.accounts().is_empty());
}

#[tokio::test]
async fn test_short_admin_password_is_rejected() {
    let (_, app) = memory_app();
    let body = multipart(
        Some(("admin.csv", "text/csv", b"name,email\nAdmin TU,tu@x.com\n")),
        Some("pendek"),
    );

    let response = app
        .oneshot(import_request("admin", Some(&token(Role::Admin)), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_admin_import_with_password() {
    let (store, app) = memory_app();
    let body = multipart(
        Some(("admin.csv", "text/csv", b"name,email\nAdmin TU,tu@x.com\n")),
        Some("rahasia-sekali"),
    );

    let response = app
        .oneshot(import_request("admin", Some(&token(Role::Admin)), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let account = store.account_by_email("tu@x.com").unwrap();
    assert_eq!(store.roles_of(account.id), vec![Role::Admin]);
}

#[tokio::test]
async fn test_upload_reaches_service_unchanged() {
    let mut mock = MockRosterService::new();
    mock.expect_import()
        .withf(|kind, upload| {
            *kind == Role::Guardian
                && upload.file_name.as_deref() == Some("wali.xlsx")
                && upload.bytes == b"PK\x03\x04"
                && upload.password.is_none()
        })
        .times(1)
        .returning(|kind, _| {
            Ok(ImportReport {
                kind,
                created: 0,
                updated: 0,
                unchanged: 0,
                guardians_created: 0,
                guardians_linked: 0,
                failures: Vec::new(),
                message: "Tidak ada data yang diimpor".to_string(),
            })
        });
    let app = app_with(Arc::new(mock), config());
    let body = multipart(
        Some((
            "wali.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            b"PK\x03\x04",
        )),
        None,
    );

    let response = app
        .oneshot(import_request("wali", Some(&token(Role::Admin)), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "guardian");
    assert_eq!(body["message"], "Tidak ada data yang diimpor");
}

// =============================================================================
// Templates and health
// =============================================================================

#[tokio::test]
async fn test_template_download() {
    let (_, app) = memory_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/imports/teacher/template")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Admin)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("template_import_guru.csv"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("name,email,nip,birth_date,phone,address\n"));
}

#[tokio::test]
async fn test_template_requires_admin() {
    let (_, app) = memory_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/imports/teacher/template")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Guardian)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health_follows_database() {
    let (store, app) = memory_app();
    let health = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app.clone().oneshot(health()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    store.set_unavailable(true);
    let response = app.oneshot(health()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["services"]["database"]["status"], "unhealthy");
}
