pub mod config;
pub mod error;
pub mod fuzz;
pub mod probe;
pub mod output;
pub mod utils;
pub mod http_client;
pub mod concurrent;

pub use crate::config::Config;
pub use crate::error::ConfigError;
pub use crate::fuzz::{Candidate, CandidateSet, EndpointFuzzer, Method};
pub use crate::output::{Discovery, DiscoveryReport, ResultAggregator};
pub use crate::probe::{ClassificationPolicy, FailureReason, ProbeOutcome};
