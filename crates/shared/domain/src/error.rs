//! Errors raised by the domain types themselves.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The password does not meet the policy
    #[error("{0}")]
    Password(String),

    /// A role, relation or entity kind that the school does not use
    #[error("Tidak dikenal: {0}")]
    Unknown(String),

    /// Hashing or another infallible-in-practice step failed
    #[error("{0}")]
    Internal(String),
}

impl DomainError {
    pub fn password(msg: impl Into<String>) -> Self {
        DomainError::Password(msg.into())
    }

    pub fn unknown(what: impl Into<String>) -> Self {
        DomainError::Unknown(what.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
