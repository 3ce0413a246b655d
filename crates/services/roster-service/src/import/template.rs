//! Example spreadsheets offered for download.

use common::{AppError, AppResult};

use super::descriptor::EntityDescriptor;

pub const TEMPLATE_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Header row in template column order, followed by one example row.
pub fn template_csv(descriptor: &EntityDescriptor) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(descriptor.columns)
        .and_then(|_| writer.write_record(descriptor.example_row))
        .map_err(|e| AppError::internal(format!("Template write failed: {}", e)))?;

    writer
        .into_inner()
        .map_err(|e| AppError::internal(format!("Template flush failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use domain::Role;

    use super::*;
    use crate::import::sheet::{read_sheet, SheetFormat};

    #[test]
    fn test_template_header_order() {
        let descriptor = EntityDescriptor::for_role(Role::Student);
        let bytes = template_csv(descriptor).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "name,email,nis,birth_date,phone,address,guardian_emails,guardian_name,\
             guardian_email,guardian_phone,guardian_address,guardian_relation"
        );
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_templates_read_back_without_missing_columns() {
        for role in Role::ALL {
            let descriptor = EntityDescriptor::for_role(role);
            let bytes = template_csv(descriptor).unwrap();
            let sheet = read_sheet(SheetFormat::Csv, &bytes).unwrap();

            assert!(descriptor.missing_columns(&sheet.headers).is_empty());
            assert_eq!(sheet.rows.len(), 1);
        }
    }
}
