use crate::common::{ConfigSnafu, Result};

#[derive(Clone, Default, serde::Deserialize)]
pub struct Config {
    pub vcenter: Option<crate::vcenter::Config>,

    pub inventory: Option<crate::service::Config>,
}

impl Config {
    /// Read the INVENTORY__* environment, e.g. INVENTORY__VCENTER__USERNAME.
    #[cfg(feature = "cli")]
    pub fn populate_from_env() -> Result<Self> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("INVENTORY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|err| {
                ConfigSnafu {
                    prefix: "environment",
                    message: err.to_string(),
                }
                .build()
            })
    }

    pub fn into_service(self) -> Result<crate::service::Inventory> {
        let vcenter = self.vcenter.ok_or_else(|| {
            ConfigSnafu {
                prefix: "vcenter",
                message: "Missing endpoint credentials",
            }
            .build()
        })?;
        let collector = crate::vcenter::VCenterCollector::try_from(vcenter)?;

        Ok(crate::service::Inventory::new(
            self.inventory.unwrap_or_default(),
            Box::new(collector),
        ))
    }
}
