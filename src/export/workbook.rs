use std::collections::HashSet;

use rust_xlsxwriter::{Workbook, Worksheet};
use snafu::prelude::*;

use crate::common::{ExportSnafu, Result, SheetNameSnafu, VmRecord};
use crate::service::CustomerSheet;

/// MIME type for the produced document, for surfaces that serve it as a
/// download instead of writing a file.
pub const CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const COLUMNS: [&str; 10] = [
    "VCENTER",
    "VM Name",
    "IP",
    "DNS",
    "Memory (GB)",
    "CPU",
    "Provisioned (GB)",
    "Used (GB)",
    "Guest OS",
    "Power",
];

/// Characters Excel forbids in worksheet names.
const FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const MAX_SHEET_NAME: usize = 31;

pub fn inventory_filename(date: chrono::NaiveDate) -> String {
    format!("Inventory_{}.xlsx", date.format("%Y-%m-%d"))
}

/// Write one worksheet per customer and return the workbook as bytes.
pub fn write_workbook(sheets: &[CustomerSheet]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut taken: HashSet<String> = HashSet::with_capacity(sheets.len());

    for sheet in sheets {
        let name = sheet_name(&sheet.customer)?;
        ensure!(
            taken.insert(name.clone()),
            SheetNameSnafu {
                customer: sheet.customer.clone(),
                message: format!("Sheet name {name:?} collides with another customer"),
            }
        );

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name).boxed_local().context(ExportSnafu {
            message: format!("Failed to name sheet for {}", sheet.customer),
        })?;
        write_sheet(worksheet, &sheet.records).boxed_local().context(ExportSnafu {
            message: format!("Failed to write sheet for {}", sheet.customer),
        })?;
    }

    workbook.save_to_buffer().boxed_local().context(ExportSnafu {
        message: "Failed to serialize workbook",
    })
}

fn write_sheet(
    worksheet: &mut Worksheet,
    records: &[VmRecord],
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = (index + 1) as u32;
        worksheet.write_string(row, 0, record.vcenter.as_str())?;
        worksheet.write_string(row, 1, record.name.as_str())?;
        worksheet.write_string(row, 2, record.ip.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 3, record.dns.as_deref().unwrap_or(""))?;
        worksheet.write_number(row, 4, record.memory_gb)?;
        worksheet.write_number(row, 5, record.cpu as f64)?;
        worksheet.write_number(row, 6, record.provisioned_gb)?;
        worksheet.write_number(row, 7, record.used_gb)?;
        worksheet.write_string(row, 8, record.guest_os.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 9, record.power.as_str())?;
    }

    Ok(())
}

/// Map a customer identifier onto a valid worksheet name. Forbidden
/// characters and edge apostrophes become underscores and the result is
/// truncated to Excel's 31-character limit. An identifier that sanitizes
/// to nothing is rejected rather than renamed.
fn sheet_name(customer: &str) -> Result<String> {
    let mut name: String = customer
        .trim()
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();

    if name.starts_with('\'') {
        name.replace_range(..1, "_");
    }
    if name.ends_with('\'') {
        let start = name.len() - 1;
        name.replace_range(start.., "_");
    }

    if name.chars().count() > MAX_SHEET_NAME {
        name = name.chars().take(MAX_SHEET_NAME).collect();
    }

    ensure!(
        !name.is_empty(),
        SheetNameSnafu {
            customer,
            message: "Customer name is empty",
        }
    );

    Ok(name)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use calamine::{Reader, Xlsx};

    use super::*;

    fn record(name: &str) -> VmRecord {
        VmRecord {
            vcenter: "vc01".to_string(),
            name: name.to_string(),
            ip: Some("10.0.0.10".to_string()),
            dns: None,
            memory_gb: 4.0,
            cpu: 2,
            provisioned_gb: 40.0,
            used_gb: 10.0,
            guest_os: Some("Ubuntu Linux (64-bit)".to_string()),
            power: "POWERED_ON".to_string(),
        }
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("Acme").unwrap(), "Acme");
        assert_eq!(sheet_name("A/B [EU]: *?").unwrap(), "A_B _EU__ __");
        assert_eq!(sheet_name("'quoted'").unwrap(), "_quoted_");
        assert_eq!(
            sheet_name("a customer with a very long display name").unwrap(),
            "a customer with a very long dis"
        );
        assert!(sheet_name("  ").is_err());
    }

    #[test]
    fn colliding_sheet_names_are_rejected() {
        let sheets = vec![
            CustomerSheet {
                customer: "A/B".to_string(),
                records: vec![],
            },
            CustomerSheet {
                customer: "A_B".to_string(),
                records: vec![],
            },
        ];
        let err = write_workbook(&sheets).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn workbook_round_reads() {
        let sheets = vec![
            CustomerSheet {
                customer: "Acme".to_string(),
                records: vec![record("web01"), record("db01")],
            },
            CustomerSheet {
                customer: "Globex".to_string(),
                records: vec![record("web01")],
            },
        ];

        let bytes = write_workbook(&sheets).unwrap();
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();

        assert_eq!(workbook.sheet_names(), vec!["Acme", "Globex"]);

        let range = workbook.worksheet_range("Acme").unwrap();
        assert_eq!(range.height(), 3);
        let header: Vec<String> = range
            .rows()
            .next()
            .unwrap()
            .iter()
            .map(|cell| cell.to_string())
            .collect();
        assert_eq!(header, COLUMNS.to_vec());

        let first: Vec<String> = range.rows().nth(1).unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(first[0], "vc01");
        assert_eq!(first[1], "web01");
        assert_eq!(first[3], "");
        assert_eq!(first[5], "2");
    }

    #[test]
    fn filename_is_dated() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(inventory_filename(date), "Inventory_2026-08-06.xlsx");
    }
}
