pub mod aggregator;
pub mod results_manager;
pub mod writer_csv;
pub mod writer_jsonl;

pub use aggregator::{Discovery, DiscoveryReport, ReportStats, ResultAggregator, RunSummary};
pub use writer_csv::write_csv;
pub use writer_jsonl::{read_jsonl, write_jsonl, write_summary_txt};
