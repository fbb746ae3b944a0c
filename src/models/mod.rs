// Domain models: samples, instantaneous snapshots, aggregated reports

mod report;
mod sample;
mod snapshot;

pub use report::{AggregatedReport, CpuAggregate, MemoryAggregate};
pub use sample::Sample;
pub use snapshot::{
    DiskUsage, EthernetStatus, InstantSnapshot, MemoryUsage, WifiStatus, round2,
};
