// Host metrics via sysinfo, plus the provider trait the scheduler samples through.

mod linux;

use crate::models::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{Disks, Networks, System};
use tracing::instrument;

const ETHERNET_PREFIXES: &[&str] = &["eth", "enp", "eno"];
const WIFI_PREFIXES: &[&str] = &["wlan", "wlp"];

/// Point-in-time host metrics. An `Err` means the subsystem could not be read this tick;
/// "no such interface" is a normal `Ok` value (`EthernetStatus::absent()` etc.).
pub trait MetricProvider {
    fn cpu_percent(&self) -> impl Future<Output = anyhow::Result<f64>> + Send;
    fn memory_usage(&self) -> impl Future<Output = anyhow::Result<MemoryUsage>> + Send;
    fn disk_usage(&self) -> impl Future<Output = anyhow::Result<DiskUsage>> + Send;
    fn ethernet_status(&self) -> impl Future<Output = anyhow::Result<EthernetStatus>> + Send;
    fn wifi_status(&self) -> impl Future<Output = anyhow::Result<WifiStatus>> + Send;
}

pub struct SysinfoRepo {
    sys: Arc<std::sync::Mutex<System>>,
    disks: Arc<std::sync::Mutex<Disks>>,
    networks: Arc<std::sync::Mutex<Networks>>,
    last_cpu_refresh: Arc<std::sync::Mutex<Option<(Instant, f64)>>>,
    disk_mount: String,
}

/// Name, first IPv4 address and link state of one interface.
struct InterfaceInfo {
    name: String,
    ipv4: Option<String>,
    is_up: bool,
}

impl SysinfoRepo {
    pub fn new(disk_mount: impl Into<String>) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            disks: Arc::new(std::sync::Mutex::new(disks)),
            networks: Arc::new(std::sync::Mutex::new(networks)),
            last_cpu_refresh: Arc::new(std::sync::Mutex::new(None)),
            disk_mount: disk_mount.into(),
        }
    }

    /// First interface whose name starts with one of `prefixes`, sorted by name for stable picks.
    async fn find_interface(
        &self,
        prefixes: &'static [&'static str],
    ) -> anyhow::Result<Option<InterfaceInfo>> {
        let networks = self.networks.clone();
        tokio::task::spawn_blocking(move || {
            let mut networks_guard = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks_guard.refresh(true);
            let mut candidates: Vec<_> = networks_guard
                .list()
                .iter()
                .filter(|(name, _)| prefixes.iter().any(|p| name.starts_with(*p)))
                .collect();
            candidates.sort_by(|a, b| a.0.cmp(b.0));
            Ok(candidates.first().map(|(name, data)| {
                let ipv4 = data
                    .ip_networks()
                    .iter()
                    .find(|n| n.addr.is_ipv4())
                    .map(|n| n.addr.to_string());
                InterfaceInfo {
                    name: (*name).clone(),
                    is_up: link_is_up(linux::interface_is_up(name), ipv4.is_some()),
                    ipv4,
                }
            }))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

impl MetricProvider for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "cpu_percent"))]
    async fn cpu_percent(&self) -> anyhow::Result<f64> {
        let sys = self.sys.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let mut guard = last_cpu_refresh
                .lock()
                .map_err(|e| anyhow::anyhow!("cpu refresh lock poisoned: {}", e))?;

            let now = Instant::now();
            let usage = match *guard {
                // Refreshing faster than sysinfo's minimum yields noise; reuse the last value.
                Some((prev_ts, prev_usage))
                    if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
                {
                    prev_usage
                }
                _ => {
                    sys.refresh_cpu_all();
                    let usage = sys.global_cpu_usage() as f64;
                    *guard = Some((now, usage));
                    usage
                }
            };
            Ok(usage.clamp(0.0, 100.0))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "memory_usage"))]
    async fn memory_usage(&self) -> anyhow::Result<MemoryUsage> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_memory();

            let total = sys.total_memory();
            anyhow::ensure!(total > 0, "total memory reported as 0");
            let available = sys.available_memory();
            let used = total.saturating_sub(available);
            Ok(MemoryUsage::from_bytes(total, used, available))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "disk_usage", mount = %self.disk_mount))]
    async fn disk_usage(&self) -> anyhow::Result<DiskUsage> {
        let disks = self.disks.clone();
        let mount = self.disk_mount.clone();
        tokio::task::spawn_blocking(move || {
            let mut disks_guard = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks_guard.refresh(true);
            let disk = disks_guard
                .list()
                .iter()
                .find(|d| d.mount_point() == std::path::Path::new(&mount))
                .ok_or_else(|| anyhow::anyhow!("no disk mounted at {}", mount))?;
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            Ok(DiskUsage::from_bytes(total, used, free))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "ethernet_status"))]
    async fn ethernet_status(&self) -> anyhow::Result<EthernetStatus> {
        Ok(match self.find_interface(ETHERNET_PREFIXES).await? {
            Some(iface) => EthernetStatus {
                connected: iface.is_up,
                interface: Some(iface.name),
                ip_address: iface.ipv4,
            },
            None => EthernetStatus::absent(),
        })
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "wifi_status"))]
    async fn wifi_status(&self) -> anyhow::Result<WifiStatus> {
        let Some(iface) = self.find_interface(WIFI_PREFIXES).await? else {
            return Ok(WifiStatus::absent());
        };
        let signal_strength_dbm = linux::read_wifi_signal_dbm(&iface.name);
        if signal_strength_dbm.is_none() {
            tracing::debug!(interface = %iface.name, "WiFi signal level unavailable");
        }
        Ok(WifiStatus {
            connected: iface.is_up && iface.ipv4.is_some(),
            interface: Some(iface.name),
            ip_address: iface.ipv4,
            signal_strength_dbm,
        })
    }
}

/// Operstate when readable; otherwise an assigned IPv4 address is the only evidence of a link.
fn link_is_up(operstate: Option<bool>, has_ipv4: bool) -> bool {
    operstate.unwrap_or(has_ipv4)
}
