#[derive(Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub username: String,

    /// Shared across all endpoints in a run. Supports the '@/path/to/file'
    /// indirection.
    #[serde(default)]
    pub password: String,

    /// Skip TLS certificate and hostname verification for every endpoint.
    /// Off unless explicitly requested.
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,

    /// Per-request timeout. Unset means a hung endpoint blocks the scan.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}
