pub use uuid::Uuid;

use crate::common::VmRecord;

/// Everything one fetch produced: per-customer tables plus the endpoint
/// failures and duplicate findings that did not abort it.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub sheets: Vec<CustomerSheet>,
    pub failures: Vec<EndpointFailure>,
    pub duplicates: Vec<DuplicateName>,
}

impl RunReport {
    pub fn records(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.records.len()).sum()
    }
}

#[derive(Debug)]
pub struct CustomerSheet {
    pub customer: String,
    pub records: Vec<VmRecord>,
}

/// One endpoint scan that failed. The customer's sheet reflects only the
/// endpoints that succeeded.
#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub customer: String,
    pub reason: String,
}

/// A VM name seen on more than one endpoint for the same customer; the
/// first-seen row was kept.
#[derive(Debug)]
pub struct DuplicateName {
    pub customer: String,
    pub name: String,
    pub vcenter: String,
}
