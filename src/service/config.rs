/// What to do when two endpoints report VMs with the same name for one
/// customer. The combined table keeps the first-seen row either way; the
/// flag policy additionally records every dropped row in the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateNames {
    #[default]
    FirstWins,
    Flag,
}

impl std::str::FromStr for DuplicateNames {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-wins" => Ok(Self::FirstWins),
            "flag" => Ok(Self::Flag),
            other => Err(format!("Unknown duplicate policy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub duplicate_names: DuplicateNames,
}
