pub mod candidates;
pub mod endpoint_fuzzer;

pub use candidates::{Candidate, CandidateSet, Method};
pub use endpoint_fuzzer::EndpointFuzzer;
