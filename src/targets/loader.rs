use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use calamine::{Reader, Xlsx};
use snafu::prelude::*;

use crate::common::{InputSnafu, Result};

pub const CUSTOMER_COLUMN: &str = "CustomerName";
pub const PORTGROUP_COLUMN: &str = "PortGroupName";

/// Customer identifier to the set of network names that select its VMs.
pub type TargetSpec = BTreeMap<String, BTreeSet<String>>;

pub fn read_targets_file(path: &Path) -> Result<TargetSpec> {
    let file = File::open(path).map_err(|err| {
        InputSnafu {
            message: format!("Failed to open reference workbook {}: {err}", path.display()),
        }
        .build()
    })?;
    read_targets(BufReader::new(file))
}

/// Read the first worksheet of the reference workbook into a target
/// specification. The header row must contain the CustomerName and
/// PortGroupName columns; data rows with a blank cell in either are
/// skipped.
pub fn read_targets<R: Read + Seek>(reader: R) -> Result<TargetSpec> {
    let mut workbook: Xlsx<_> = Xlsx::new(reader).map_err(|err| {
        InputSnafu {
            message: format!("Failed to read reference workbook: {err}"),
        }
        .build()
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            InputSnafu {
                message: "Reference workbook has no worksheets",
            }
            .build()
        })?
        .map_err(|err| {
            InputSnafu {
                message: format!("Failed to read reference worksheet: {err}"),
            }
            .build()
        })?;

    let mut rows = range.rows();
    let header = rows.next().context(InputSnafu {
        message: "Reference worksheet is empty",
    })?;

    let customer_col = find_column(header, CUSTOMER_COLUMN)?;
    let portgroup_col = find_column(header, PORTGROUP_COLUMN)?;

    let mut spec = TargetSpec::new();
    let mut pairs = 0usize;
    for row in rows {
        let customer = cell_text(row, customer_col);
        let portgroup = cell_text(row, portgroup_col);
        if customer.is_empty() || portgroup.is_empty() {
            continue;
        }
        spec.entry(customer).or_default().insert(portgroup);
        pairs += 1;
    }

    tracing::info!(
        customers = spec.len(),
        pairs = pairs,
        "Reference workbook loaded",
    );

    Ok(spec)
}

fn find_column(header: &[calamine::Data], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|cell| cell.to_string().trim() == name)
        .context(InputSnafu {
            message: format!("Reference workbook is missing the {name} column"),
        })
}

fn cell_text(row: &[calamine::Data], col: usize) -> String {
    row.get(col)
        .map(|cell| cell.to_string().trim().to_string())
        .unwrap_or_default()
}
