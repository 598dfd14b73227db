pub mod http_probe;

pub use http_probe::{join_url, probe_candidate, ClassificationPolicy, FailureReason, ProbeOutcome};
