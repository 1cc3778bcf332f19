use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde::de::DeserializeOwned;
use snafu::prelude::*;

use crate::common::{
    dedupe_by_name, key_file_or_string, Collector, ConfigSnafu, EndpointSnafu, InputSnafu,
    RequestSnafu, Result, VmRecord,
};

use super::models::{NetworkSummary, NicBacking, VmInfo, VmSummary};

const COLLECTOR_NAME: &str = "vCenter";
const SESSION_HEADER: &str = "vmware-api-session-id";

const GIB: f64 = (1u64 << 30) as f64;

pub struct VCenterCollector {
    agent: ureq::Agent,
    username: String,
    password: String,
}

impl TryFrom<super::Config> for VCenterCollector {
    type Error = crate::common::Error;

    fn try_from(value: super::Config) -> Result<Self> {
        ensure!(
            !value.username.is_empty(),
            ConfigSnafu {
                prefix: "vcenter.username",
                message: "A username is required",
            }
        );

        let password = key_file_or_string(value.password, "vcenter.password".into())?;

        let mut tls = native_tls::TlsConnector::builder();
        if value.danger_accept_invalid_certs {
            // Explicit opt-in. The endpoints this tool talks to commonly run
            // self-signed management certificates.
            tls.danger_accept_invalid_certs(true);
            tls.danger_accept_invalid_hostnames(true);
        }
        let tls = tls.build().map_err(|err| {
            ConfigSnafu {
                prefix: "vcenter",
                message: format!("Failed to initialize TLS: {err}"),
            }
            .build()
        })?;

        let mut agent = ureq::AgentBuilder::new().tls_connector(Arc::new(tls));
        if let Some(secs) = value.request_timeout_secs {
            agent = agent.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            agent: agent.build(),
            username: value.username,
            password,
        })
    }
}

impl Collector for VCenterCollector {
    fn collect(&self, endpoint: &str, targets: &BTreeSet<String>) -> Result<Vec<VmRecord>> {
        let base = endpoint_url(endpoint)?;
        let session = Session::open(&self.agent, base, endpoint, &self.username, &self.password)?;

        // Port-group lookup, rebuilt fresh on every connection.
        let networks: Vec<NetworkSummary> = session.get(&["api", "vcenter", "network"])?;
        let portgroups: HashMap<String, String> = networks
            .into_iter()
            .map(|network| (network.network, network.name))
            .collect();

        let summaries: Vec<VmSummary> = session.get(&["api", "vcenter", "vm"])?;
        let scanned = summaries.len();

        let mut records = Vec::new();
        for summary in summaries {
            let info: VmInfo = session.get(&["api", "vcenter", "vm", summary.vm.as_str()])?;
            if let Some(record) = convert_vm(endpoint, &info, &portgroups, targets) {
                records.push(record);
            }
        }

        let records = dedupe_by_name(records).kept;

        tracing::info!(
            collector = COLLECTOR_NAME,
            endpoint = endpoint,
            vms = scanned,
            records = records.len(),
            "Scan completed",
        );

        Ok(records)
    }
}

/// Bare hosts get an https scheme; full URLs pass through.
fn endpoint_url(endpoint: &str) -> Result<url::Url> {
    let trimmed = endpoint.trim();
    ensure!(
        !trimmed.is_empty(),
        InputSnafu {
            message: "Empty endpoint address",
        }
    );

    let raw = match trimmed.contains("://") {
        true => trimmed.to_string(),
        false => format!("https://{trimmed}"),
    };

    let url = url::Url::parse(&raw).map_err(|err| {
        InputSnafu {
            message: format!("Invalid endpoint address {trimmed}: {err}"),
        }
        .build()
    })?;
    ensure!(
        !url.cannot_be_a_base(),
        InputSnafu {
            message: format!("Invalid endpoint address {trimmed}"),
        }
    );

    Ok(url)
}

/// Decide whether one VM belongs in the inventory and project it if so.
///
/// A VM without a populated config, or flagged as a template, is skipped.
/// Adapters are walked in device order and the VM is emitted at most once,
/// on the first adapter whose resolved network name is in the target set.
fn convert_vm(
    endpoint: &str,
    info: &VmInfo,
    portgroups: &HashMap<String, String>,
    targets: &BTreeSet<String>,
) -> Option<VmRecord> {
    let config = info.config.as_ref()?;
    if config.template {
        return None;
    }

    let matched = config.nics.iter().any(|nic| {
        let name = match &nic.backing {
            NicBacking::StandardPortgroup { network_name } => Some(network_name.as_str()),
            NicBacking::DistributedPortgroup { portgroup_key } => {
                portgroups.get(portgroup_key).map(String::as_str)
            }
            NicBacking::Other => None,
        };
        name.is_some_and(|name| targets.contains(name))
    });
    if !matched {
        return None;
    }

    let (provisioned, used) = match &info.storage {
        Some(storage) => (storage.provisioned, storage.used.unwrap_or(0)),
        None => (0, 0),
    };

    Some(VmRecord {
        vcenter: endpoint.to_string(),
        name: config.name.clone(),
        ip: info.guest.as_ref().and_then(|guest| guest.ip_address.clone()),
        dns: info.guest.as_ref().and_then(|guest| guest.host_name.clone()),
        memory_gb: config.memory_size_mib as f64 / 1024.0,
        cpu: config.cpu_count,
        provisioned_gb: provisioned as f64 / GIB,
        used_gb: used as f64 / GIB,
        guest_os: config.guest_full_name.clone(),
        power: info.runtime.power_state.clone(),
    })
}

/// One authenticated session against one endpoint. Dropping the session
/// releases it on the endpoint no matter how the scan exits.
struct Session<'a> {
    agent: &'a ureq::Agent,
    base: url::Url,
    endpoint: String,
    token: String,
}

impl<'a> Session<'a> {
    fn open(
        agent: &'a ureq::Agent,
        base: url::Url,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let url = join(&base, &["api", "session"]);
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));

        let token: String = agent
            .post(url.as_str())
            .set("Authorization", &format!("Basic {credentials}"))
            .call()
            .context(RequestSnafu {
                url: url.as_str(),
                method: "POST",
            })?
            .into_json()
            .boxed_local()
            .context(EndpointSnafu {
                endpoint,
                message: "Failed to deserialize session token",
            })?;

        Ok(Self {
            agent,
            base,
            endpoint: endpoint.to_string(),
            token,
        })
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = join(&self.base, segments);
        self.agent
            .get(url.as_str())
            .set(SESSION_HEADER, &self.token)
            .call()
            .context(RequestSnafu {
                url: url.as_str(),
                method: "GET",
            })?
            .into_json()
            .boxed_local()
            .context(EndpointSnafu {
                endpoint: self.endpoint.as_str(),
                message: "Failed to deserialize response",
            })
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let url = join(&self.base, &["api", "session"]);
        if let Err(err) = self
            .agent
            .delete(url.as_str())
            .set(SESSION_HEADER, &self.token)
            .call()
        {
            tracing::warn!(
                collector = COLLECTOR_NAME,
                endpoint = self.endpoint.as_str(),
                error = err.to_string(),
                "Failed to close session",
            );
        }
    }
}

fn join(base: &url::Url, segments: &[&str]) -> url::Url {
    let mut url = base.clone();
    url.path_segments_mut()
        .expect("endpoint url should be a base url")
        .pop_if_empty()
        .extend(segments);
    url
}

#[cfg(test)]
mod tests {
    use super::super::models::{GuestInfo, Nic, RuntimeInfo, StorageSummary, VmConfig};
    use super::*;

    fn targets(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn flat_nic(network: &str) -> Nic {
        Nic {
            backing: NicBacking::StandardPortgroup {
                network_name: network.to_string(),
            },
        }
    }

    fn dvs_nic(key: &str) -> Nic {
        Nic {
            backing: NicBacking::DistributedPortgroup {
                portgroup_key: key.to_string(),
            },
        }
    }

    fn vm(name: &str, nics: Vec<Nic>) -> VmInfo {
        VmInfo {
            config: Some(VmConfig {
                name: name.to_string(),
                template: false,
                memory_size_mib: 4096,
                cpu_count: 2,
                guest_full_name: Some("Ubuntu Linux (64-bit)".to_string()),
                nics,
            }),
            guest: Some(GuestInfo {
                ip_address: Some("10.0.0.10".to_string()),
                host_name: Some("web01.example.com".to_string()),
            }),
            storage: Some(StorageSummary {
                provisioned: 40 * (1 << 30),
                used: Some(10 * (1 << 30)),
            }),
            runtime: RuntimeInfo {
                power_state: "POWERED_ON".to_string(),
            },
        }
    }

    #[test]
    fn flat_attachment_matches() {
        let info = vm("web01", vec![flat_nic("VLAN100")]);
        let record = convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"]))
            .expect("should match");

        assert_eq!(record.vcenter, "vc01");
        assert_eq!(record.name, "web01");
        assert_eq!(record.ip.as_deref(), Some("10.0.0.10"));
        assert_eq!(record.dns.as_deref(), Some("web01.example.com"));
        assert_eq!(record.memory_gb, 4.0);
        assert_eq!(record.cpu, 2);
        assert_eq!(record.provisioned_gb, 40.0);
        assert_eq!(record.used_gb, 10.0);
        assert_eq!(record.power, "POWERED_ON");
    }

    #[test]
    fn non_matching_vm_is_skipped() {
        let info = vm("db01", vec![flat_nic("VLAN200")]);
        assert!(convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"])).is_none());
    }

    #[test]
    fn multiple_matching_adapters_emit_once() {
        let info = vm("web01", vec![flat_nic("VLAN100"), flat_nic("VLAN100")]);
        let record = convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"]));
        assert!(record.is_some());
    }

    #[test]
    fn portgroup_key_resolves_through_lookup() {
        let lookup: HashMap<String, String> =
            [("dvportgroup-7".to_string(), "VLAN100".to_string())].into();

        let info = vm("web01", vec![dvs_nic("dvportgroup-7")]);
        let record = convert_vm("vc01", &info, &lookup, &targets(&["VLAN100"]))
            .expect("key-backed attachment should match like a flat one");
        assert_eq!(record.name, "web01");
    }

    #[test]
    fn unresolvable_portgroup_key_never_matches() {
        let info = vm("web01", vec![dvs_nic("dvportgroup-404")]);
        assert!(convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"])).is_none());
    }

    #[test]
    fn template_vm_is_skipped() {
        let mut info = vm("gold-image", vec![flat_nic("VLAN100")]);
        info.config.as_mut().unwrap().template = true;
        assert!(convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"])).is_none());
    }

    #[test]
    fn vm_without_config_is_skipped() {
        let mut info = vm("half-created", vec![flat_nic("VLAN100")]);
        info.config = None;
        assert!(convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"])).is_none());
    }

    #[test]
    fn missing_guest_and_storage_fields_have_defaults() {
        let mut info = vm("web01", vec![flat_nic("VLAN100")]);
        info.guest = None;
        info.storage.as_mut().unwrap().used = None;

        let record = convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"]))
            .expect("should match");
        assert_eq!(record.ip, None);
        assert_eq!(record.dns, None);
        assert_eq!(record.used_gb, 0.0);
        assert_eq!(record.provisioned_gb, 40.0);

        info.storage = None;
        let record = convert_vm("vc01", &info, &HashMap::new(), &targets(&["VLAN100"]))
            .expect("should match");
        assert_eq!(record.provisioned_gb, 0.0);
        assert_eq!(record.used_gb, 0.0);
    }

    #[test]
    fn backing_variants_deserialize() {
        let info: VmInfo = serde_json::from_str(
            r#"{
                "config": {
                    "name": "web01",
                    "memory_size_mib": 2048,
                    "cpu_count": 1,
                    "nics": [
                        {"backing": {"type": "STANDARD_PORTGROUP", "network_name": "VLAN100"}},
                        {"backing": {"type": "DISTRIBUTED_PORTGROUP", "portgroup_key": "dvportgroup-7"}},
                        {"backing": {"type": "HOST_DEVICE"}}
                    ]
                },
                "runtime": {"power_state": "POWERED_OFF"}
            }"#,
        )
        .expect("fixture should deserialize");

        let config = info.config.expect("config present");
        assert_eq!(config.nics.len(), 3);
        assert!(matches!(
            config.nics[0].backing,
            NicBacking::StandardPortgroup { .. }
        ));
        assert!(matches!(
            config.nics[1].backing,
            NicBacking::DistributedPortgroup { .. }
        ));
        assert!(matches!(config.nics[2].backing, NicBacking::Other));
        assert!(!config.template);
    }

    #[test]
    fn endpoint_url_accepts_bare_hosts_and_urls() {
        assert_eq!(
            endpoint_url("vc01.example.com").unwrap().as_str(),
            "https://vc01.example.com/"
        );
        assert_eq!(
            endpoint_url(" 10.1.2.3 ").unwrap().as_str(),
            "https://10.1.2.3/"
        );
        assert_eq!(
            endpoint_url("http://vc01:8443").unwrap().as_str(),
            "http://vc01:8443/"
        );
        assert!(endpoint_url("").is_err());
        assert!(endpoint_url("https://").is_err());
    }

    #[test]
    fn join_builds_api_paths() {
        let base = endpoint_url("vc01").unwrap();
        assert_eq!(
            join(&base, &["api", "vcenter", "vm", "vm-42"]).as_str(),
            "https://vc01/api/vcenter/vm/vm-42"
        );
    }
}
