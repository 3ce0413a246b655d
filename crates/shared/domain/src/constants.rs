//! Domain-level constants.
//!
//! Business rules for roster records and the limits enforced on imports.

// =============================================================================
// Roles
// =============================================================================

/// Administrator role
pub const ROLE_ADMIN: &str = "admin";

/// Teacher (guru) role
pub const ROLE_TEACHER: &str = "teacher";

/// Student (santri) role
pub const ROLE_STUDENT: &str = "student";

/// Guardian (wali) role
pub const ROLE_GUARDIAN: &str = "guardian";

// =============================================================================
// Field limits
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_ADDRESS_LENGTH: usize = 500;
pub const MAX_PHONE_LENGTH: usize = 20;

/// Upper bound for NIS / NIP values
pub const MAX_SECONDARY_ID_LENGTH: usize = 32;

// =============================================================================
// Imports
// =============================================================================

/// Password given to accounts created by an import when none is configured
pub const DEFAULT_IMPORT_PASSWORD: &str = "Password!123";

/// Domain used to synthesize login emails for students imported without one
pub const DEFAULT_PLACEHOLDER_EMAIL_DOMAIN: &str = "santri.local";

/// Student spreadsheets carry more columns, so they get a larger cap
pub const STUDENT_UPLOAD_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// Cap for teacher, guardian and admin spreadsheets
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Attempts made to find a free NIS/NIP before the row is given up
pub const MAX_SECONDARY_ID_ATTEMPTS: usize = 10;

// =============================================================================
// Authentication
// =============================================================================

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Default JWT token expiration in hours
pub const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";
