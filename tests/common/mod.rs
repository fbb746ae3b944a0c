// Shared test helpers: in-memory collaborators and a one-shot local HTTP server.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use hostwatch::connectivity::ConnectivityProbe;
use hostwatch::error::{DeliveryError, RecoveryError};
use hostwatch::models::*;
use hostwatch::outage::RecoveryPolicy;
use hostwatch::recovery::RecoveryAction;
use hostwatch::report_sink::{DeliveryOutcome, ReportSink};
use hostwatch::scheduler::SchedulerConfig;
use hostwatch::sysinfo_repo::MetricProvider;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub fn wall_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        sample_interval: Duration::from_secs(5),
        aggregation_period: Duration::from_secs(60),
        connectivity_check_interval: Duration::from_secs(60),
        stats_log_interval: Duration::from_secs(3600),
        outage_timeout_minutes: 15.0,
        recovery_policy: RecoveryPolicy::EveryCheck,
        probe_attempt_timeout: Duration::from_secs(1),
        probe_budget: Duration::from_secs(2),
        delivery_timeout: Duration::from_secs(2),
        recovery_timeout: Duration::from_secs(2),
        device_id: "test-device".into(),
    }
}

pub fn instant_snapshot() -> InstantSnapshot {
    InstantSnapshot {
        disk: DiskUsage::from_bytes(100 * 1024 * 1024 * 1024, 40 * 1024 * 1024 * 1024, 60 * 1024 * 1024 * 1024),
        ethernet: EthernetStatus {
            interface: Some("eth0".into()),
            connected: true,
            ip_address: Some("192.168.1.10".into()),
        },
        wifi: WifiStatus::absent(),
        memory: MemoryUsage::from_bytes(1024 * 1024 * 1024, 512 * 1024 * 1024, 512 * 1024 * 1024),
    }
}

struct ProviderState {
    cpu: VecDeque<f64>,
    memory_percent: f64,
    fail_cpu: bool,
    fail_disk: bool,
}

/// Metric provider fed from a queue of CPU values; memory percent is fixed.
#[derive(Clone)]
pub struct FakeProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl FakeProvider {
    pub fn new(cpu: Vec<f64>, memory_percent: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState {
                cpu: cpu.into(),
                memory_percent,
                fail_cpu: false,
                fail_disk: false,
            })),
        }
    }

    pub fn set_fail_cpu(&self, fail: bool) {
        self.state.lock().unwrap().fail_cpu = fail;
    }

    pub fn set_fail_disk(&self, fail: bool) {
        self.state.lock().unwrap().fail_disk = fail;
    }
}

impl MetricProvider for FakeProvider {
    async fn cpu_percent(&self) -> anyhow::Result<f64> {
        let mut state = self.state.lock().unwrap();
        anyhow::ensure!(!state.fail_cpu, "cpu unavailable");
        Ok(state.cpu.pop_front().unwrap_or(0.0))
    }

    async fn memory_usage(&self) -> anyhow::Result<MemoryUsage> {
        let percent = self.state.lock().unwrap().memory_percent;
        Ok(MemoryUsage {
            total_mb: 1024.0,
            used_mb: round2(1024.0 * percent / 100.0),
            available_mb: round2(1024.0 * (100.0 - percent) / 100.0),
            percent: Some(percent),
        })
    }

    async fn disk_usage(&self) -> anyhow::Result<DiskUsage> {
        anyhow::ensure!(!self.state.lock().unwrap().fail_disk, "disk unavailable");
        Ok(instant_snapshot().disk)
    }

    async fn ethernet_status(&self) -> anyhow::Result<EthernetStatus> {
        Ok(instant_snapshot().ethernet)
    }

    async fn wifi_status(&self) -> anyhow::Result<WifiStatus> {
        Ok(WifiStatus::absent())
    }
}

/// Probe returning a switchable answer; counts calls.
#[derive(Clone)]
pub struct FakeProbe {
    reachable: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for FakeProbe {
    async fn is_reachable(&self, _timeout: Duration) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Probe that never answers within any reasonable budget.
pub struct HangingProbe;

impl ConnectivityProbe for HangingProbe {
    async fn is_reachable(&self, _timeout: Duration) -> bool {
        tokio::time::sleep(Duration::from_secs(60)).await;
        true
    }
}

/// Sink recording persisted and delivered reports.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub persisted: Arc<Mutex<Vec<AggregatedReport>>>,
    pub delivery_attempts: Arc<Mutex<Vec<AggregatedReport>>>,
    pub fail_persist: Arc<AtomicBool>,
    pub fail_deliver: Arc<AtomicBool>,
}

impl ReportSink for RecordingSink {
    async fn persist(&self, report: &AggregatedReport) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail_persist.load(Ordering::SeqCst), "disk full");
        self.persisted.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn deliver(&self, report: &AggregatedReport) -> Result<DeliveryOutcome, DeliveryError> {
        self.delivery_attempts.lock().unwrap().push(report.clone());
        if self.fail_deliver.load(Ordering::SeqCst) {
            return Err(DeliveryError::Status { status: 503 });
        }
        Ok(DeliveryOutcome::Delivered { status: 200 })
    }
}

/// Recovery action that only counts invocations.
#[derive(Clone, Default)]
pub struct CountingRecovery {
    pub calls: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl RecoveryAction for CountingRecovery {
    async fn invoke(&self) -> Result<(), RecoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RecoveryError::EmptyCommand);
        }
        Ok(())
    }
}

/// Accepts one connection, answers with `status_line` (e.g. "200 OK") and returns the raw request.
pub async fn spawn_http_server(
    status_line: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        request
    });
    (format!("http://{addr}"), handle)
}

/// URL on a local port with nothing listening.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
