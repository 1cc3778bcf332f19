#[derive(serde::Deserialize)]
pub(super) struct NetworkSummary {
    /// Internal identifier, e.g. "network-12" or "dvportgroup-7".
    pub network: String,
    pub name: String,
}

/// VM list entry. Only the id is consumed; everything else comes from the
/// per-VM detail fetch.
#[derive(serde::Deserialize)]
pub(super) struct VmSummary {
    pub vm: String,
}

#[derive(serde::Deserialize)]
pub(super) struct VmInfo {
    /// Absent while a VM is still being created or is inaccessible.
    pub config: Option<VmConfig>,
    #[serde(default)]
    pub guest: Option<GuestInfo>,
    #[serde(default)]
    pub storage: Option<StorageSummary>,
    pub runtime: RuntimeInfo,
}

#[derive(serde::Deserialize)]
pub(super) struct VmConfig {
    pub name: String,
    #[serde(default)]
    pub template: bool,
    pub memory_size_mib: u64,
    pub cpu_count: u32,
    #[serde(default)]
    pub guest_full_name: Option<String>,
    /// Network adapters in device order.
    #[serde(default)]
    pub nics: Vec<Nic>,
}

#[derive(serde::Deserialize)]
pub(super) struct Nic {
    pub backing: NicBacking,
}

/// The two attachment shapes a network adapter can have: a flat attachment
/// naming the network directly, or a virtual-switch attachment carrying a
/// port-group key that resolves through the per-endpoint lookup. Anything
/// else (host devices, opaque networks) never matches.
#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum NicBacking {
    StandardPortgroup { network_name: String },
    DistributedPortgroup { portgroup_key: String },
    #[serde(other)]
    Other,
}

#[derive(serde::Deserialize)]
pub(super) struct GuestInfo {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub host_name: Option<String>,
}

#[derive(serde::Deserialize)]
pub(super) struct StorageSummary {
    /// Bytes.
    pub provisioned: u64,
    /// Bytes. Endpoints omit this for VMs that never powered on.
    #[serde(default)]
    pub used: Option<u64>,
}

#[derive(serde::Deserialize)]
pub(super) struct RuntimeInfo {
    pub power_state: String,
}
