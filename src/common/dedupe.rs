use std::collections::HashSet;

use super::VmRecord;

pub(crate) struct DedupeResult {
    pub kept: Vec<VmRecord>,
    pub dropped: Vec<VmRecord>,
}

/// Collapse records sharing a VM name down to the first occurrence.
///
/// Input order is preserved, so with endpoint-iteration order upstream the
/// first-seen endpoint wins. Dropped rows are returned for the duplicate
/// policy to report on.
pub(crate) fn dedupe_by_name(records: Vec<VmRecord>) -> DedupeResult {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = Vec::new();

    for record in records {
        if seen.insert(record.name.clone()) {
            kept.push(record);
        } else {
            dropped.push(record);
        }
    }

    DedupeResult { kept, dropped }
}
