// Per-tick CPU/memory reading held in the sample buffer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One instantaneous CPU/memory reading. Percentages are clamped to [0, 100] on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            timestamp,
            cpu_percent: clamp_percent(cpu_percent),
            memory_percent: clamp_percent(memory_percent),
        }
    }
}

// NaN readings collapse to 0 so they cannot poison max/avg.
fn clamp_percent(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) }
}
