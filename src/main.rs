use anyhow::Result;
use hostwatch::*;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = version::VERSION,
        device_id = %app_config.delivery.device_id,
        sample_interval_secs = app_config.monitoring.sample_interval_secs,
        aggregation_period_secs = app_config.monitoring.aggregation_period_secs,
        connectivity_check_interval_secs = app_config.monitoring.connectivity_check_interval_secs,
        reboot_timeout_minutes = app_config.outage.reboot_timeout_minutes,
        recovery_policy = ?app_config.outage.recovery_policy,
        "{} starting",
        version::NAME
    );

    let report_log = report_sink::ReportLog::open(&app_config.report_log.path)?;
    let delivery = if app_config.delivery.enabled {
        if app_config.delivery.bearer_token.is_empty() {
            tracing::warn!("delivery.bearer_token is empty; the API will likely reject reports");
        }
        Some(report_sink::HttpDelivery::new(
            app_config.delivery.api_url.clone(),
            app_config.delivery.bearer_token.clone(),
            Duration::from_secs(app_config.delivery.timeout_secs),
        )?)
    } else {
        tracing::info!("remote delivery disabled; reports are only written locally");
        None
    };

    let deps = scheduler::SchedulerDeps {
        provider: sysinfo_repo::SysinfoRepo::new(app_config.monitoring.disk_mount.clone()),
        probe: connectivity::HttpProbe::new(app_config.connectivity.hosts.clone())?,
        sink: report_sink::Reporter::new(report_log, delivery),
        recovery: recovery::CommandRecovery::new(
            app_config.outage.reboot_command.clone(),
            Duration::from_secs(app_config.outage.recovery_timeout_secs),
            app_config.outage.dry_run,
        ),
    };
    let scheduler = scheduler::Scheduler::new(
        scheduler::SchedulerConfig::from_app_config(&app_config),
        deps,
        Instant::now(),
        chrono::Utc::now(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    let stats = scheduler.run(shutdown_rx).await?;
    tracing::info!(
        ticks = stats.ticks,
        reports_persisted = stats.reports_persisted,
        reports_delivered = stats.reports_delivered,
        "monitoring stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
