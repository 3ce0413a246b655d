//! Multipart import upload extractor.

use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::StatusCode,
};
use validator::Validate;

use common::AppError;
use roster_service_lib::import::Upload;

/// Form fields sent next to the file.
#[derive(Debug, Default, Validate)]
struct UploadForm {
    #[validate(length(min = 8, message = "Password minimal 8 karakter"))]
    password: Option<String>,
}

/// The `file` part of a multipart body, plus the optional admin `password`.
pub struct ImportUpload(pub Upload);

#[async_trait]
impl<S> FromRequest<S> for ImportUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;

        let mut upload = Upload::default();
        let mut form = UploadForm::default();
        let mut has_file = false;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    upload.file_name = field.file_name().map(str::to_string);
                    upload.content_type = field.content_type().map(str::to_string);
                    upload.bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
                    has_file = true;
                }
                Some("password") => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.password = Some(value).filter(|v| !v.is_empty());
                }
                _ => {}
            }
        }

        if !has_file {
            return Err(AppError::bad_request("Field 'file' wajib diisi"));
        }

        form.validate().map_err(|e| {
            let message = e
                .field_errors()
                .values()
                .next()
                .and_then(|errors| errors.first())
                .and_then(|error| error.message.as_ref())
                .map(|msg| msg.to_string())
                .unwrap_or_else(|| "Validation failed".to_string());
            AppError::validation(message)
        })?;

        upload.password = form.password;
        Ok(ImportUpload(upload))
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::bad_request(err.body_text())
    }
}
