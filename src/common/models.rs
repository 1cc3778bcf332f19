use std::collections::BTreeSet;

/// One inventory row: a VM that matched a target network on one endpoint.
///
/// Guest-reported fields (ip, dns, guest_os) are absent when the endpoint
/// does not know them; they export as empty cells.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VmRecord {
    pub vcenter: String,
    pub name: String,
    pub ip: Option<String>,
    pub dns: Option<String>,
    pub memory_gb: f64,
    pub cpu: u32,
    pub provisioned_gb: f64,
    pub used_gb: f64,
    pub guest_os: Option<String>,
    pub power: String,
}

pub trait Collector {
    /// Scan one endpoint and return the records for VMs attached to any of
    /// the target networks, deduplicated by VM name.
    fn collect(&self, endpoint: &str, targets: &BTreeSet<String>) -> super::Result<Vec<VmRecord>>;
}
