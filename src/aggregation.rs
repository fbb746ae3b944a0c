// Window aggregation: reduce buffered samples plus an instantaneous snapshot into one report.
// Pure logic; draining the buffer and sending the report stay in the scheduler.

use chrono::{DateTime, Utc};

use crate::models::{
    AggregatedReport, CpuAggregate, InstantSnapshot, MemoryAggregate, Sample, round2,
};

/// Bounds and identity of the window being flushed.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub device_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period_seconds: u64,
}

/// Max and mean of one metric, rounded to 2 places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxAvg {
    pub max: f64,
    pub avg: f64,
}

/// `None` when there are no values; callers report that as "no data".
pub fn max_avg(values: impl IntoIterator<Item = f64>) -> Option<MaxAvg> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        count += 1;
        sum += v;
        max = max.max(v);
    }
    if count == 0 {
        return None;
    }
    Some(MaxAvg {
        max: round2(max),
        avg: round2(sum / count as f64),
    })
}

/// Builds the report for one window. Same inputs always give the same report.
pub fn build(
    samples: &[Sample],
    instant: &InstantSnapshot,
    window: &WindowInfo,
) -> AggregatedReport {
    let samples_count = samples.len();
    let cpu = max_avg(samples.iter().map(|s| s.cpu_percent));
    let memory = max_avg(samples.iter().map(|s| s.memory_percent));

    AggregatedReport {
        device_id: window.device_id.clone(),
        timestamp: window.end,
        window_start: window.start,
        window_end: window.end,
        period_seconds: window.period_seconds,
        samples_count,
        disk: instant.disk.clone(),
        ethernet: instant.ethernet.clone(),
        wifi: instant.wifi.clone(),
        cpu: CpuAggregate {
            max_percent: cpu.map(|a| a.max),
            avg_percent: cpu.map(|a| a.avg),
            samples: samples_count,
        },
        memory: MemoryAggregate {
            max_percent: memory.map(|a| a.max),
            avg_percent: memory.map(|a| a.avg),
            current: instant.memory.clone(),
            samples: samples_count,
        },
    }
}
