//! Row validation.
//!
//! Applies an entity's field rules to one raw row. Every failing column yields
//! its own [`RowFailure`]; a row with any failure is skipped by the engine.

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidateEmail;

use domain::{ProfileFields, RelationType};

use super::descriptor::{Check, EntityDescriptor};
use super::report::RowFailure;
use super::sheet::{CellValue, RawRow};

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9\s\-().]*$").expect("phone pattern is valid"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Day zero of Excel's 1900 date system, shifted for its leap-year bug.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Guardian described inline on a student row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineGuardian {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A row that passed validation, with typed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub row: usize,
    pub name: String,
    pub email: Option<String>,
    /// NIS / NIP as supplied
    pub secondary_id: Option<String>,
    pub fields: ProfileFields,
    pub guardian_emails: Vec<String>,
    pub guardian: Option<InlineGuardian>,
    pub relation: RelationType,
}

pub struct RowValidator<'a> {
    descriptor: &'a EntityDescriptor,
}

impl<'a> RowValidator<'a> {
    pub fn new(descriptor: &'a EntityDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn validate(&self, raw: &RawRow) -> Result<RowRecord, Vec<RowFailure>> {
        let failures: Vec<RowFailure> = self
            .descriptor
            .rules
            .iter()
            .filter_map(|rule| {
                let errors: Vec<String> = rule
                    .checks
                    .iter()
                    .filter_map(|check| check_cell(raw, rule.field, *check))
                    .collect();
                (!errors.is_empty()).then(|| RowFailure {
                    row: raw.number,
                    attribute: Some(rule.field.to_string()),
                    errors,
                    values: raw.values(),
                })
            })
            .collect();

        if !failures.is_empty() {
            return Err(failures);
        }
        Ok(self.record(raw))
    }

    /// Build the typed record. Only called once every rule passed.
    fn record(&self, raw: &RawRow) -> RowRecord {
        let secondary_id = self
            .descriptor
            .secondary_id
            .and_then(|spec| raw.text(spec.column));

        let guardian = raw.text("guardian_email").map(|email| InlineGuardian {
            name: raw.text("guardian_name").unwrap_or_default(),
            email,
            phone: raw.text("guardian_phone"),
            address: raw.text("guardian_address"),
        });

        RowRecord {
            row: raw.number,
            name: raw.text("name").unwrap_or_default(),
            email: raw.text("email"),
            secondary_id,
            fields: ProfileFields {
                phone: raw.text("phone"),
                address: raw.text("address"),
                birth_date: raw.get("birth_date").and_then(parse_date),
            },
            guardian_emails: split_emails(raw.text("guardian_emails").as_deref()),
            guardian: guardian.filter(|_| self.descriptor.links_guardians),
            relation: raw
                .text("guardian_relation")
                .and_then(|r| r.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// Message for a failed check, `None` when the check passes. Optional checks
/// pass on blank cells.
fn check_cell(raw: &RawRow, field: &str, check: Check) -> Option<String> {
    let text = raw.text(field);

    match check {
        Check::Required => text.is_none().then(|| format!("{} wajib diisi", field)),
        Check::RequiredWith(other) => (text.is_none() && raw.text(other).is_some())
            .then(|| format!("{} wajib diisi jika {} diisi", field, other)),
        Check::Email => text
            .filter(|value| !value.validate_email())
            .map(|_| format!("{} harus berupa alamat email yang valid", field)),
        Check::MaxLength(max) => text
            .filter(|value| value.chars().count() > max)
            .map(|_| format!("{} maksimal {} karakter", field, max)),
        Check::Phone => text
            .filter(|value| !PHONE_RE.is_match(value))
            .map(|_| format!("{} hanya boleh berisi angka, spasi, +, -, dan tanda kurung", field)),
        Check::Date => match raw.get(field) {
            Some(cell) if !cell.is_blank() && parse_date(cell).is_none() => Some(format!(
                "{} bukan tanggal yang valid (gunakan YYYY-MM-DD atau DD/MM/YYYY)",
                field
            )),
            _ => None,
        },
        Check::Relation => text
            .filter(|value| value.parse::<RelationType>().is_err())
            .map(|_| format!("{} harus salah satu dari: ayah, ibu, wali", field)),
    }
}

/// Accepts the common written formats and Excel serial day numbers.
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Number(serial) => from_excel_serial(*serial),
        CellValue::Text(text) => {
            let text = text.trim();
            // "2012-01-01 00:00:00" or "2012-01-01T00:00:00"
            let date_part = match text.get(..10) {
                Some(head) if text[10..].starts_with([' ', 'T']) => head,
                _ => text,
            };
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
                .or_else(|| text.parse::<f64>().ok().and_then(from_excel_serial))
        }
        CellValue::Empty => None,
    }
}

fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    // Anything past 9999-12-31 is not a date
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
}

/// Split a `guardian_emails` cell on commas or semicolons.
fn split_emails(cell: Option<&str>) -> Vec<String> {
    let mut emails: Vec<String> = Vec::new();
    for email in cell.unwrap_or_default().split([',', ';']) {
        let email = email.trim();
        if !email.is_empty() && !emails.iter().any(|e| e == email) {
            emails.push(email.to_string());
        }
    }
    emails
}
