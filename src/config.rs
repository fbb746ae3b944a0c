use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::outage::RecoveryPolicy;

/// Upper bound for every period in `[monitoring]`.
pub const MAX_PERIOD_SECS: u64 = 86_400;
/// Upper bound for probe, delivery and recovery timeouts.
pub const MAX_TIMEOUT_SECS: u64 = 3_600;
/// One week.
pub const MAX_REBOOT_TIMEOUT_MINUTES: u64 = 10_080;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub outage: OutageConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub report_log: ReportLogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Tick period; one sample is taken per tick.
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
    /// How often a report is built and sent.
    #[serde(default = "default_aggregation_period_secs")]
    pub aggregation_period_secs: u64,
    #[serde(default = "default_connectivity_check_interval_secs")]
    pub connectivity_check_interval_secs: u64,
    /// How often to log agent stats at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
    /// Mount point whose usage goes into the report.
    #[serde(default = "default_disk_mount")]
    pub disk_mount: String,
}

fn default_sample_interval_secs() -> u64 {
    5
}

fn default_aggregation_period_secs() -> u64 {
    60
}

fn default_connectivity_check_interval_secs() -> u64 {
    60
}

fn default_stats_log_interval_secs() -> u64 {
    3600
}

fn default_disk_mount() -> String {
    "/".into()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval_secs(),
            aggregation_period_secs: default_aggregation_period_secs(),
            connectivity_check_interval_secs: default_connectivity_check_interval_secs(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
            disk_mount: default_disk_mount(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    /// URLs tried in order; any HTTP response from any of them counts as reachable.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    /// Per-host request timeout.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_hosts() -> Vec<String> {
    vec![
        "http://8.8.8.8".into(),
        "http://1.1.1.1".into(),
        "http://www.google.com".into(),
    ]
}

fn default_probe_timeout_secs() -> u64 {
    5
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutageConfig {
    /// Minutes without internet before the recovery command runs.
    #[serde(default = "default_reboot_timeout_minutes")]
    pub reboot_timeout_minutes: u64,
    #[serde(default)]
    pub recovery_policy: RecoveryPolicy,
    #[serde(default = "default_reboot_command")]
    pub reboot_command: Vec<String>,
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
    /// Log the recovery instead of running the command.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_reboot_timeout_minutes() -> u64 {
    15
}

fn default_reboot_command() -> Vec<String> {
    vec!["sudo".into(), "reboot".into()]
}

fn default_recovery_timeout_secs() -> u64 {
    30
}

impl Default for OutageConfig {
    fn default() -> Self {
        Self {
            reboot_timeout_minutes: default_reboot_timeout_minutes(),
            recovery_policy: RecoveryPolicy::default(),
            reboot_command: default_reboot_command(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub bearer_token: String,
    /// Identifies this host in every report.
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://api.example.com/monitoring".into()
}

fn default_device_id() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".into())
}

fn default_delivery_timeout_secs() -> u64 {
    30
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_api_url(),
            bearer_token: String::new(),
            device_id: default_device_id(),
            timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportLogConfig {
    /// Append-only JSON-lines file, one report per line.
    #[serde(default = "default_report_log_path")]
    pub path: String,
}

fn default_report_log_path() -> String {
    "/var/log/hostwatch/reports.jsonl".into()
}

impl Default for ReportLogConfig {
    fn default() -> Self {
        Self {
            path: default_report_log_path(),
        }
    }
}

impl AppConfig {
    /// Loads from `CONFIG_FILE` if set, else the first existing default location,
    /// else built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var("CONFIG_FILE") {
            return Self::load_from_path(Path::new(&path));
        }
        match default_locations().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_path(&path),
            None => {
                tracing::info!("no config file found; using built-in defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
        let config = Self::load_from_str(&s)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring.sample_interval_secs)
    }

    pub fn aggregation_period(&self) -> Duration {
        Duration::from_secs(self.monitoring.aggregation_period_secs)
    }

    pub fn connectivity_check_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring.connectivity_check_interval_secs)
    }

    pub fn stats_log_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring.stats_log_interval_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let m = &self.monitoring;
        anyhow::ensure!(
            m.sample_interval_secs > 0,
            "monitoring.sample_interval_secs must be > 0, got {}",
            m.sample_interval_secs
        );
        anyhow::ensure!(
            m.aggregation_period_secs <= MAX_PERIOD_SECS,
            "monitoring.aggregation_period_secs must be <= {MAX_PERIOD_SECS}, got {}",
            m.aggregation_period_secs
        );
        anyhow::ensure!(
            m.aggregation_period_secs >= m.sample_interval_secs,
            "monitoring.aggregation_period_secs must be >= sample_interval_secs ({}), got {}",
            m.sample_interval_secs,
            m.aggregation_period_secs
        );
        anyhow::ensure!(
            m.connectivity_check_interval_secs > 0,
            "monitoring.connectivity_check_interval_secs must be > 0, got {}",
            m.connectivity_check_interval_secs
        );
        anyhow::ensure!(
            m.connectivity_check_interval_secs <= MAX_PERIOD_SECS,
            "monitoring.connectivity_check_interval_secs must be <= {MAX_PERIOD_SECS}, got {}",
            m.connectivity_check_interval_secs
        );
        anyhow::ensure!(
            m.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            m.stats_log_interval_secs
        );
        anyhow::ensure!(
            m.stats_log_interval_secs <= MAX_PERIOD_SECS,
            "monitoring.stats_log_interval_secs must be <= {MAX_PERIOD_SECS}, got {}",
            m.stats_log_interval_secs
        );
        anyhow::ensure!(
            !m.disk_mount.is_empty(),
            "monitoring.disk_mount must be non-empty"
        );
        anyhow::ensure!(
            !self.connectivity.hosts.is_empty(),
            "connectivity.hosts must list at least one URL"
        );
        for host in &self.connectivity.hosts {
            reqwest::Url::parse(host)
                .map_err(|e| anyhow::anyhow!("connectivity.hosts: invalid URL {host:?}: {e}"))?;
        }
        anyhow::ensure!(
            self.connectivity.probe_timeout_secs > 0,
            "connectivity.probe_timeout_secs must be > 0, got {}",
            self.connectivity.probe_timeout_secs
        );
        anyhow::ensure!(
            self.connectivity.probe_timeout_secs <= MAX_TIMEOUT_SECS,
            "connectivity.probe_timeout_secs must be <= {MAX_TIMEOUT_SECS}, got {}",
            self.connectivity.probe_timeout_secs
        );
        anyhow::ensure!(
            self.outage.reboot_timeout_minutes > 0,
            "outage.reboot_timeout_minutes must be > 0, got {}",
            self.outage.reboot_timeout_minutes
        );
        anyhow::ensure!(
            self.outage.reboot_timeout_minutes <= MAX_REBOOT_TIMEOUT_MINUTES,
            "outage.reboot_timeout_minutes must be <= {MAX_REBOOT_TIMEOUT_MINUTES}, got {}",
            self.outage.reboot_timeout_minutes
        );
        anyhow::ensure!(
            self.outage.reboot_command.first().is_some_and(|p| !p.is_empty()),
            "outage.reboot_command must name a program"
        );
        anyhow::ensure!(
            self.outage.recovery_timeout_secs > 0,
            "outage.recovery_timeout_secs must be > 0, got {}",
            self.outage.recovery_timeout_secs
        );
        anyhow::ensure!(
            self.outage.recovery_timeout_secs <= MAX_TIMEOUT_SECS,
            "outage.recovery_timeout_secs must be <= {MAX_TIMEOUT_SECS}, got {}",
            self.outage.recovery_timeout_secs
        );
        if self.delivery.enabled {
            reqwest::Url::parse(&self.delivery.api_url).map_err(|e| {
                anyhow::anyhow!("delivery.api_url: invalid URL {:?}: {e}", self.delivery.api_url)
            })?;
        }
        anyhow::ensure!(
            !self.delivery.device_id.is_empty(),
            "delivery.device_id must be non-empty"
        );
        anyhow::ensure!(
            self.delivery.timeout_secs > 0,
            "delivery.timeout_secs must be > 0, got {}",
            self.delivery.timeout_secs
        );
        anyhow::ensure!(
            self.delivery.timeout_secs <= MAX_TIMEOUT_SECS,
            "delivery.timeout_secs must be <= {MAX_TIMEOUT_SECS}, got {}",
            self.delivery.timeout_secs
        );
        anyhow::ensure!(
            !self.report_log.path.is_empty(),
            "report_log.path must be non-empty"
        );
        Ok(())
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("config.toml"),
        PathBuf::from("/etc/hostwatch/config.toml"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(Path::new(&home).join(".hostwatch").join("config.toml"));
    }
    paths
}
