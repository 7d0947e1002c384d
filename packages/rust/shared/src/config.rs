//! Application configuration for trackfill.
//!
//! User config lives at `~/.trackfill/trackfill.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackfillError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "trackfill.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".trackfill";

// ---------------------------------------------------------------------------
// Config structs (matching trackfill.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fetch executor limits.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Column names in the ticket export.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Row and column filtering rules.
    #[serde(default)]
    pub filters: FiltersConfig,

    /// Input file lookup.
    #[serde(default)]
    pub input: InputConfig,

    /// Carrier families, in the order their batches run.
    #[serde(default = "default_carriers")]
    pub carriers: Vec<CarrierConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            columns: ColumnsConfig::default(),
            filters: FiltersConfig::default(),
            input: InputConfig::default(),
            carriers: default_carriers(),
        }
    }
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum simultaneous in-flight lookups per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-lookup timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Optional deadline for a whole batch; unfinished lookups become `NotFound`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_deadline_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout(),
            batch_deadline_secs: None,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_secs.map(Duration::from_secs)
    }
}

fn default_concurrency() -> usize {
    10
}
fn default_request_timeout() -> u64 {
    30
}

/// `[columns]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_status_column")]
    pub status: String,
    #[serde(default = "default_category_column")]
    pub category: String,
    #[serde(default = "default_agent_column")]
    pub agent: String,
    #[serde(default = "default_courier_column")]
    pub courier: String,
    #[serde(default = "default_tracking_column")]
    pub tracking_id: String,
    /// Derived column holding the latest status text.
    #[serde(default = "default_status_text_column")]
    pub status_text: String,
    /// Derived column holding the latest status timestamp.
    #[serde(default = "default_status_timestamp_column")]
    pub status_timestamp: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            status: default_status_column(),
            category: default_category_column(),
            agent: default_agent_column(),
            courier: default_courier_column(),
            tracking_id: default_tracking_column(),
            status_text: default_status_text_column(),
            status_timestamp: default_status_timestamp_column(),
        }
    }
}

fn default_status_column() -> String {
    "TICKET STATUS".into()
}
fn default_category_column() -> String {
    "CATEGORY NAME".into()
}
fn default_agent_column() -> String {
    "AGENT NAME".into()
}
fn default_courier_column() -> String {
    "COURIER NAME".into()
}
fn default_tracking_column() -> String {
    "TRACKING ID".into()
}
fn default_status_text_column() -> String {
    "Details".into()
}
fn default_status_timestamp_column() -> String {
    "Details Date".into()
}

/// `[filters]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Rows whose status contains this substring are dropped (case-sensitive).
    #[serde(default = "default_closed_marker")]
    pub closed_marker: String,

    /// Rows whose category equals one of these are dropped.
    #[serde(default = "default_excluded_categories")]
    pub excluded_categories: Vec<String>,

    /// Rows assigned to one of these agents are dropped.
    #[serde(default)]
    pub excluded_agents: Vec<String>,

    /// Columns removed from the output.
    #[serde(default = "default_dropped_columns")]
    pub dropped_columns: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            closed_marker: default_closed_marker(),
            excluded_categories: default_excluded_categories(),
            excluded_agents: Vec::new(),
            dropped_columns: default_dropped_columns(),
        }
    }
}

fn default_closed_marker() -> String {
    "Closed".into()
}
fn default_excluded_categories() -> Vec<String> {
    vec!["OTHERS".into(), "DISPUTE".into()]
}
fn default_dropped_columns() -> Vec<String> {
    vec!["PRIORITY".into(), "DEPARTMENT".into()]
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// File name prefix used when the input is a directory.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_file_prefix() -> String {
    "mydata_".into()
}

/// Response format spoken by a carrier endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CarrierKind {
    /// HTML page with a highlighted scan table row.
    Markup,
    /// Plain-text dump with `[ScanDetail]` sections.
    ScanLog,
}

/// `[[carriers]]` entry: one carrier family and the adapter that serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Family name used in logs and reports.
    pub family: String,
    /// Response format.
    pub kind: CarrierKind,
    /// Endpoint URL template; `{id}` is replaced by the encoded tracking id.
    pub endpoint: String,
    /// Exact courier-name values routed to this family.
    pub courier_names: Vec<String>,
    /// Background colour marking the latest scan row (markup carriers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_marker: Option<String>,
    /// Query parameters appended to the endpoint, mapped to the env var holding each value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_env: BTreeMap<String, String>,
}

fn default_carriers() -> Vec<CarrierConfig> {
    vec![
        CarrierConfig {
            family: "bluedart".into(),
            kind: CarrierKind::Markup,
            endpoint: "https://api.bluedart.com/servlet/RoutingServlet?handler=tnt&action=custawbquery&awb=awb&numbers={id}&format=html&verno=1.3f&scan=1".into(),
            courier_names: vec!["Bluedart".into(), "BlueDart Surface".into()],
            row_marker: Some("WHITE".into()),
            query_env: BTreeMap::from([
                ("loginid".to_string(), "BLUEDART_LOGIN_ID".to_string()),
                ("lickey".to_string(), "BLUEDART_LICENSE_KEY".to_string()),
            ]),
        },
        CarrierConfig {
            family: "delhivery".into(),
            kind: CarrierKind::ScanLog,
            endpoint: "https://selloship.com/vendor/test/track_order/{id}".into(),
            courier_names: vec![
                "Delhivery Express".into(),
                "Delhivery FR".into(),
                "Delhivery FR Surface 10kg".into(),
            ],
            row_marker: None,
            query_env: BTreeMap::new(),
        },
    ]
}

impl AppConfig {
    /// Reject configs the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(TrackfillError::config("fetch.concurrency must be at least 1"));
        }
        if self.fetch.request_timeout_secs == 0 {
            return Err(TrackfillError::config(
                "fetch.request_timeout_secs must be at least 1",
            ));
        }

        let mut families = HashSet::new();
        let mut couriers = HashSet::new();
        for carrier in &self.carriers {
            if !families.insert(carrier.family.as_str()) {
                return Err(TrackfillError::config(format!(
                    "carrier family '{}' is defined twice",
                    carrier.family
                )));
            }
            if !carrier.endpoint.contains("{id}") {
                return Err(TrackfillError::config(format!(
                    "endpoint for '{}' has no {{id}} placeholder",
                    carrier.family
                )));
            }
            for name in &carrier.courier_names {
                if !couriers.insert(name.as_str()) {
                    return Err(TrackfillError::config(format!(
                        "courier name '{name}' is claimed by more than one family"
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.trackfill/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TrackfillError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.trackfill/trackfill.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TrackfillError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TrackfillError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TrackfillError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TrackfillError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TrackfillError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
