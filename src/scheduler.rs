// Main loop: one cooperative tick per sample interval.
// Sampling, connectivity checks, report flushes and stats logging share the tick; each
// periodic job is a next-due instant compared against the tick time. All state is owned here.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::{MissedTickBehavior, interval_at};

use crate::aggregation::{self, WindowInfo};
use crate::config::AppConfig;
use crate::connectivity::ConnectivityProbe;
use crate::error::{DeliveryError, RecoveryError, TickError};
use crate::models::{
    AggregatedReport, DiskUsage, EthernetStatus, InstantSnapshot, MemoryUsage, Sample, WifiStatus,
};
use crate::outage::{ConnectivityState, OutageAction, OutageTracker, RecoveryPolicy, outage_duration};
use crate::recovery::RecoveryAction;
use crate::report_sink::{DeliveryOutcome, ReportSink};
use crate::sample_buffer::SampleBuffer;
use crate::sysinfo_repo::MetricProvider;

/// Periods, timeouts and identity for one run. Immutable after construction.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub sample_interval: Duration,
    pub aggregation_period: Duration,
    pub connectivity_check_interval: Duration,
    pub stats_log_interval: Duration,
    pub outage_timeout_minutes: f64,
    pub recovery_policy: RecoveryPolicy,
    /// Bound for a single probe attempt, passed to the probe.
    pub probe_attempt_timeout: Duration,
    /// Bound for the whole connectivity check.
    pub probe_budget: Duration,
    pub delivery_timeout: Duration,
    pub recovery_timeout: Duration,
    pub device_id: String,
}

impl SchedulerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let probe_attempt_timeout = Duration::from_secs(config.connectivity.probe_timeout_secs);
        let attempts = u32::try_from(config.connectivity.hosts.len().max(1)).unwrap_or(u32::MAX);
        Self {
            sample_interval: config.sample_interval(),
            aggregation_period: config.aggregation_period(),
            connectivity_check_interval: config.connectivity_check_interval(),
            stats_log_interval: config.stats_log_interval(),
            outage_timeout_minutes: config.outage.reboot_timeout_minutes as f64,
            recovery_policy: config.outage.recovery_policy,
            probe_attempt_timeout,
            probe_budget: probe_attempt_timeout
                .saturating_mul(attempts)
                .saturating_add(Duration::from_secs(1)),
            delivery_timeout: Duration::from_secs(config.delivery.timeout_secs),
            recovery_timeout: Duration::from_secs(config.outage.recovery_timeout_secs),
            device_id: config.delivery.device_id.clone(),
        }
    }
}

/// External collaborators driven by the scheduler.
pub struct SchedulerDeps<M, P, S, R> {
    pub provider: M,
    pub probe: P,
    pub sink: S,
    pub recovery: R,
}

/// Running counters, logged every `stats_log_interval`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub samples: u64,
    pub samples_skipped: u64,
    pub connectivity_checks: u64,
    pub reports_persisted: u64,
    pub reports_delivered: u64,
    pub delivery_failures: u64,
    pub recovery_attempts: u64,
    pub recovery_failures: u64,
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub sampled: bool,
    pub outage_action: Option<OutageAction>,
    pub report: Option<AggregatedReport>,
}

pub struct Scheduler<M, P, S, R> {
    config: SchedulerConfig,
    provider: M,
    probe: P,
    sink: S,
    recovery: R,
    buffer: SampleBuffer,
    tracker: OutageTracker,
    started_at: Instant,
    window_start: DateTime<Utc>,
    next_connectivity_check: Instant,
    next_aggregation: Instant,
    next_stats_log: Instant,
    stats: SchedulerStats,
}

impl<M, P, S, R> Scheduler<M, P, S, R>
where
    M: MetricProvider,
    P: ConnectivityProbe,
    S: ReportSink,
    R: RecoveryAction,
{
    /// `start` / `start_wall` anchor every period; the first tick runs one sample interval later.
    pub fn new(
        config: SchedulerConfig,
        deps: SchedulerDeps<M, P, S, R>,
        start: Instant,
        start_wall: DateTime<Utc>,
    ) -> Self {
        let SchedulerDeps {
            provider,
            probe,
            sink,
            recovery,
        } = deps;
        Self {
            next_connectivity_check: start + config.connectivity_check_interval,
            next_aggregation: start + config.aggregation_period,
            next_stats_log: start + config.stats_log_interval,
            tracker: OutageTracker::new(config.recovery_policy),
            config,
            provider,
            probe,
            sink,
            recovery,
            buffer: SampleBuffer::new(),
            started_at: start,
            window_start: start_wall,
            stats: SchedulerStats::default(),
        }
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn connectivity_state(&self) -> ConnectivityState {
        self.tracker.state()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Runs until `shutdown_rx` fires (or its sender is dropped) or a tick fails fatally.
    /// The stop signal is only observed between ticks.
    #[tracing::instrument(
        name = "scheduler",
        level = "debug",
        skip_all,
        fields(sample_interval_secs = self.config.sample_interval.as_secs())
    )]
    pub async fn run(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<SchedulerStats, TickError> {
        let first_tick = tokio::time::Instant::from_std(self.started_at + self.config.sample_interval);
        let mut tick = interval_at(first_tick, self.config.sample_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => {
                    tracing::info!(pending_samples = self.buffer.len(), "scheduler stopping");
                    break;
                }
                deadline = tick.tick() => {
                    if let Err(e) = self.tick_at(deadline.into_std(), Utc::now()).await {
                        tracing::error!(error = %e, "fatal error in main loop");
                        return Err(e);
                    }
                }
            }
        }
        Ok(self.stats)
    }

    /// One tick at monotonic time `now` (wall clock `wall`): sample, then any due checks.
    pub async fn tick_at(
        &mut self,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<TickOutcome, TickError> {
        self.stats.ticks += 1;
        let mut outcome = TickOutcome {
            sampled: self.collect_sample(wall).await,
            ..TickOutcome::default()
        };

        if now >= self.next_connectivity_check {
            outcome.outage_action = Some(self.check_connectivity(now).await);
            self.next_connectivity_check = next_due(
                self.next_connectivity_check,
                self.config.connectivity_check_interval,
                now,
            );
        }

        if now >= self.next_aggregation {
            let flushed = self.flush_window(wall).await;
            self.next_aggregation =
                next_due(self.next_aggregation, self.config.aggregation_period, now);
            outcome.report = Some(flushed?);
        }

        if now >= self.next_stats_log {
            self.log_stats(now);
            self.next_stats_log = next_due(self.next_stats_log, self.config.stats_log_interval, now);
        }

        Ok(outcome)
    }

    async fn collect_sample(&mut self, wall: DateTime<Utc>) -> bool {
        let cpu = self.provider.cpu_percent().await;
        let memory = self.provider.memory_usage().await;
        match (cpu, memory) {
            (Ok(cpu), Ok(MemoryUsage { percent: Some(mem), .. })) => {
                self.buffer.add(Sample::new(wall, cpu, mem));
                self.stats.samples += 1;
                true
            }
            (cpu, memory) => {
                if let Err(e) = cpu {
                    tracing::warn!(error = %e, operation = "cpu_percent", "CPU reading failed; sample skipped");
                }
                match memory {
                    Err(e) => tracing::warn!(error = %e, operation = "memory_usage", "memory reading failed; sample skipped"),
                    Ok(MemoryUsage { percent: None, .. }) => {
                        tracing::warn!(operation = "memory_usage", "memory percent unknown; sample skipped")
                    }
                    Ok(_) => {}
                }
                self.stats.samples_skipped += 1;
                false
            }
        }
    }

    async fn check_connectivity(&mut self, now: Instant) -> OutageAction {
        self.stats.connectivity_checks += 1;
        let reachable = match tokio::time::timeout(
            self.config.probe_budget,
            self.probe.is_reachable(self.config.probe_attempt_timeout),
        )
        .await
        {
            Ok(reachable) => reachable,
            Err(_) => {
                tracing::warn!(budget = ?self.config.probe_budget, "connectivity check timed out; treating as unreachable");
                false
            }
        };

        let before = self.tracker.state();
        let action = self
            .tracker
            .check(reachable, now, self.config.outage_timeout_minutes);

        match action {
            OutageAction::None => {
                if before == ConnectivityState::Connected && !reachable {
                    tracing::warn!("internet connectivity lost");
                }
            }
            OutageAction::Restored => {
                tracing::info!(
                    outage_secs = outage_duration(before, now).as_secs(),
                    "internet connectivity restored"
                );
            }
            OutageAction::WarnOngoing { elapsed_minutes } => {
                tracing::warn!(
                    elapsed_minutes = %format!("{elapsed_minutes:.1}"),
                    timeout_minutes = self.config.outage_timeout_minutes,
                    "internet still unavailable"
                );
            }
            OutageAction::TriggerRecovery { elapsed_minutes } => {
                tracing::error!(
                    elapsed_minutes = %format!("{elapsed_minutes:.1}"),
                    timeout_minutes = self.config.outage_timeout_minutes,
                    "internet unavailable past timeout; invoking recovery"
                );
                self.invoke_recovery().await;
            }
        }
        action
    }

    async fn invoke_recovery(&mut self) {
        self.stats.recovery_attempts += 1;
        let result = tokio::time::timeout(self.config.recovery_timeout, self.recovery.invoke())
            .await
            .unwrap_or(Err(RecoveryError::Timeout(self.config.recovery_timeout)));
        if let Err(e) = result {
            self.stats.recovery_failures += 1;
            tracing::error!(error = %e, operation = "recovery", "recovery action failed");
        }
    }

    /// Drains the buffer into a report, persists it, then attempts delivery regardless of
    /// the persist result. A persist failure is returned after delivery has been tried.
    async fn flush_window(&mut self, wall: DateTime<Utc>) -> Result<AggregatedReport, TickError> {
        let samples = self.buffer.drain();
        let instant = self.instant_snapshot().await;
        let window = WindowInfo {
            device_id: self.config.device_id.clone(),
            start: self.window_start,
            end: wall,
            period_seconds: self.config.aggregation_period.as_secs(),
        };
        let report = aggregation::build(&samples, &instant, &window);
        self.window_start = wall;
        if report.has_no_data() {
            tracing::warn!("aggregation window closed with no samples");
        }

        let persisted = self.sink.persist(&report).await;
        match &persisted {
            Ok(()) => self.stats.reports_persisted += 1,
            Err(e) => tracing::error!(error = %e, operation = "persist_report", "failed to write report log"),
        }

        let delivered = tokio::time::timeout(self.config.delivery_timeout, self.sink.deliver(&report))
            .await
            .unwrap_or(Err(DeliveryError::Timeout(self.config.delivery_timeout)));
        match delivered {
            Ok(DeliveryOutcome::Delivered { status }) => {
                self.stats.reports_delivered += 1;
                tracing::info!(status, samples_count = report.samples_count, "report delivered");
            }
            Ok(DeliveryOutcome::Disabled) => {
                tracing::debug!("remote delivery disabled");
            }
            Err(e) => {
                self.stats.delivery_failures += 1;
                tracing::warn!(error = %e, operation = "deliver_report", "report delivery failed");
            }
        }

        persisted.map_err(TickError::Persist)?;
        Ok(report)
    }

    async fn instant_snapshot(&self) -> InstantSnapshot {
        let disk = self.provider.disk_usage().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "disk_usage", "disk snapshot unavailable");
            DiskUsage::unknown()
        });
        let ethernet = self.provider.ethernet_status().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "ethernet_status", "ethernet snapshot unavailable");
            EthernetStatus::absent()
        });
        let wifi = self.provider.wifi_status().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "wifi_status", "WiFi snapshot unavailable");
            WifiStatus::absent()
        });
        let memory = self.provider.memory_usage().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "memory_usage", "memory snapshot unavailable");
            MemoryUsage::unknown()
        });
        InstantSnapshot {
            disk,
            ethernet,
            wifi,
            memory,
        }
    }

    fn log_stats(&self, now: Instant) {
        let s = &self.stats;
        tracing::info!(
            ticks = s.ticks,
            samples = s.samples,
            samples_skipped = s.samples_skipped,
            connectivity_checks = s.connectivity_checks,
            reports_persisted = s.reports_persisted,
            reports_delivered = s.reports_delivered,
            delivery_failures = s.delivery_failures,
            recovery_attempts = s.recovery_attempts,
            recovery_failures = s.recovery_failures,
            outage_secs = outage_duration(self.tracker.state(), now).as_secs(),
            "agent stats"
        );
    }
}

/// Advances a deadline by one period, keeping the cadence aligned to the first deadline;
/// if the loop fell more than a period behind, restarts the cadence from `now`.
fn next_due(due: Instant, period: Duration, now: Instant) -> Instant {
    let next = due + period;
    if next <= now { now + period } else { next }
}
