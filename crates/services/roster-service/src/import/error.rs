//! Whole-file import failures.
//!
//! These abort an import before any row is touched. Problems with individual
//! rows never surface here; they end up in the report's failure list.

use thiserror::Error;

use common::AppError;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Format file tidak didukung, gunakan .csv atau .xlsx")]
    UnsupportedFormat,

    #[error("Ukuran file {size} byte melebihi batas {limit} byte")]
    TooLarge { size: usize, limit: usize },

    #[error("File tidak dapat dibaca: {0}")]
    Unreadable(String),

    #[error("File tidak memiliki baris judul kolom")]
    MissingHeader,

    #[error("Kolom wajib tidak ditemukan: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Password wajib diisi untuk impor admin")]
    MissingPassword,

    #[error("Password tidak valid: {0}")]
    InvalidPassword(String),

    #[error("Gagal menyiapkan impor: {0}")]
    Setup(String),
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::UnsupportedFormat => AppError::UnsupportedMediaType(err.to_string()),
            ImportError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ImportError::MissingPassword | ImportError::InvalidPassword(_) => {
                AppError::Validation(err.to_string())
            }
            ImportError::Setup(msg) => AppError::Internal(msg),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}
