// Library for tests to access modules

pub mod aggregation;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod outage;
pub mod recovery;
pub mod report_sink;
pub mod sample_buffer;
pub mod scheduler;
pub mod sysinfo_repo;
pub mod version;
