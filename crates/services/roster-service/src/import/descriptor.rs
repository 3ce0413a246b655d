//! Per-entity import descriptors.
//!
//! One reconciliation engine serves every roster kind. What differs between
//! students, teachers, guardians and admins (columns, field rules, the NIS/NIP
//! generator, upload cap and wording in the summary) is captured here.

use domain::{
    Role, DEFAULT_UPLOAD_LIMIT_BYTES, MAX_ADDRESS_LENGTH, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH,
    MAX_PHONE_LENGTH, MAX_SECONDARY_ID_LENGTH, STUDENT_UPLOAD_LIMIT_BYTES,
};

/// A single check applied to one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Required,
    /// Required whenever the named column is filled in
    RequiredWith(&'static str),
    Email,
    MaxLength(usize),
    Phone,
    Date,
    Relation,
}

/// The checks for one column, in the order they are reported.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub checks: &'static [Check],
}

/// How NIS/NIP values are named and generated.
#[derive(Debug, Clone, Copy)]
pub struct SecondaryIdSpec {
    /// Spreadsheet column holding the value
    pub column: &'static str,
    /// Label used in messages (NIS, NIP)
    pub label: &'static str,
    /// chrono format string for the timestamp prefix
    pub prefix_format: &'static str,
    /// Number of random digits appended after the prefix
    pub random_digits: u32,
}

#[derive(Debug)]
pub struct EntityDescriptor {
    pub role: Role,
    /// Word used in the summary sentence ("santri", "guru", ...)
    pub noun: &'static str,
    /// Template column order
    pub columns: &'static [&'static str],
    /// Columns that must be present in the header row
    pub required_columns: &'static [&'static str],
    pub rules: &'static [FieldRule],
    pub secondary_id: Option<SecondaryIdSpec>,
    pub max_upload_bytes: usize,
    pub example_row: &'static [&'static str],
    /// Rows may attach guardians
    pub links_guardians: bool,
    /// Rows may omit the email; one is synthesized from the NIS
    pub email_optional: bool,
}

impl EntityDescriptor {
    pub fn for_role(role: Role) -> &'static EntityDescriptor {
        match role {
            Role::Student => &STUDENT,
            Role::Teacher => &TEACHER,
            Role::Guardian => &GUARDIAN,
            Role::Admin => &ADMIN,
        }
    }

    /// Download name of the example spreadsheet.
    pub fn template_file_name(&self) -> String {
        format!("template_import_{}.csv", self.noun)
    }

    /// Required columns absent from `headers`.
    pub fn missing_columns(&self, headers: &[String]) -> Vec<String> {
        self.required_columns
            .iter()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .map(|column| column.to_string())
            .collect()
    }
}

const NAME: FieldRule = FieldRule {
    field: "name",
    checks: &[Check::Required, Check::MaxLength(MAX_NAME_LENGTH)],
};

const REQUIRED_EMAIL: FieldRule = FieldRule {
    field: "email",
    checks: &[Check::Required, Check::Email, Check::MaxLength(MAX_EMAIL_LENGTH)],
};

const PHONE: FieldRule = FieldRule {
    field: "phone",
    checks: &[Check::Phone, Check::MaxLength(MAX_PHONE_LENGTH)],
};

const ADDRESS: FieldRule = FieldRule {
    field: "address",
    checks: &[Check::MaxLength(MAX_ADDRESS_LENGTH)],
};

static STUDENT: EntityDescriptor = EntityDescriptor {
    role: Role::Student,
    noun: "santri",
    columns: &[
        "name",
        "email",
        "nis",
        "birth_date",
        "phone",
        "address",
        "guardian_emails",
        "guardian_name",
        "guardian_email",
        "guardian_phone",
        "guardian_address",
        "guardian_relation",
    ],
    required_columns: &["name", "birth_date"],
    rules: &[
        NAME,
        FieldRule {
            field: "email",
            checks: &[Check::Email, Check::MaxLength(MAX_EMAIL_LENGTH)],
        },
        FieldRule {
            field: "nis",
            checks: &[Check::MaxLength(MAX_SECONDARY_ID_LENGTH)],
        },
        FieldRule {
            field: "birth_date",
            checks: &[Check::Required, Check::Date],
        },
        PHONE,
        ADDRESS,
        FieldRule {
            field: "guardian_name",
            checks: &[
                Check::RequiredWith("guardian_email"),
                Check::MaxLength(MAX_NAME_LENGTH),
            ],
        },
        FieldRule {
            field: "guardian_email",
            checks: &[Check::Email, Check::MaxLength(MAX_EMAIL_LENGTH)],
        },
        FieldRule {
            field: "guardian_phone",
            checks: &[Check::Phone, Check::MaxLength(MAX_PHONE_LENGTH)],
        },
        FieldRule {
            field: "guardian_address",
            checks: &[Check::MaxLength(MAX_ADDRESS_LENGTH)],
        },
        FieldRule {
            field: "guardian_relation",
            checks: &[Check::Relation],
        },
    ],
    secondary_id: Some(SecondaryIdSpec {
        column: "nis",
        label: "NIS",
        prefix_format: "%Y%m",
        random_digits: 4,
    }),
    max_upload_bytes: STUDENT_UPLOAD_LIMIT_BYTES,
    example_row: &[
        "Ahmad Fauzi",
        "ahmad@example.com",
        "",
        "2012-01-01",
        "081234567890",
        "Jl. Pesantren No. 1",
        "wali.lama@example.com",
        "Budi Santoso",
        "budi@example.com",
        "081298765432",
        "Jl. Pesantren No. 1",
        "ayah",
    ],
    links_guardians: true,
    email_optional: true,
};

static TEACHER: EntityDescriptor = EntityDescriptor {
    role: Role::Teacher,
    noun: "guru",
    columns: &["name", "email", "nip", "birth_date", "phone", "address"],
    required_columns: &["name", "email"],
    rules: &[
        NAME,
        REQUIRED_EMAIL,
        FieldRule {
            field: "nip",
            checks: &[Check::MaxLength(MAX_SECONDARY_ID_LENGTH)],
        },
        FieldRule {
            field: "birth_date",
            checks: &[Check::Date],
        },
        PHONE,
        ADDRESS,
    ],
    secondary_id: Some(SecondaryIdSpec {
        column: "nip",
        label: "NIP",
        prefix_format: "%Y%m%d",
        random_digits: 4,
    }),
    max_upload_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
    example_row: &[
        "Ustadz Hasan",
        "hasan@example.com",
        "",
        "1985-07-17",
        "081311112222",
        "Asrama Putra Blok B",
    ],
    links_guardians: false,
    email_optional: false,
};

static GUARDIAN: EntityDescriptor = EntityDescriptor {
    role: Role::Guardian,
    noun: "wali",
    columns: &["name", "email", "phone", "address"],
    required_columns: &["name", "email", "phone"],
    rules: &[
        NAME,
        REQUIRED_EMAIL,
        FieldRule {
            field: "phone",
            checks: &[Check::Required, Check::Phone, Check::MaxLength(MAX_PHONE_LENGTH)],
        },
        ADDRESS,
    ],
    secondary_id: None,
    max_upload_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
    example_row: &[
        "Budi Santoso",
        "budi@example.com",
        "081298765432",
        "Jl. Pesantren No. 1",
    ],
    links_guardians: false,
    email_optional: false,
};

static ADMIN: EntityDescriptor = EntityDescriptor {
    role: Role::Admin,
    noun: "admin",
    columns: &["name", "email"],
    required_columns: &["name", "email"],
    rules: &[NAME, REQUIRED_EMAIL],
    secondary_id: None,
    max_upload_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
    example_row: &["Admin Tata Usaha", "tu@example.com"],
    links_guardians: false,
    email_optional: false,
};
