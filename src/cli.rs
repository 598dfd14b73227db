use clap::Parser;
use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging (global)
    #[arg(long, default_value_t = false, global = true)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Probe every wordlist path with every method and report what answers
    Fuzz {
        /// Base URL to probe (e.g. https://example.com/api)
        base_url: Option<String>,

        /// Newline-delimited wordlist of path fragments
        #[arg(short = 'w', long, required_unless_present = "resume")]
        wordlist: Option<PathBuf>,

        /// HTTP method to try (repeatable; default: GET POST PUT DELETE PATCH)
        #[arg(short = 'm', long = "method", value_name = "METHOD")]
        methods: Vec<String>,

        /// Maximum number of in-flight probes (default: 50)
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,

        /// Per-request timeout in milliseconds (default: 3000)
        #[arg(short = 't', long)]
        timeout_ms: Option<u64>,

        /// Status code meaning "not present" (repeatable; replaces the default 403, 404)
        #[arg(short = 'x', long = "exclude-status", value_name = "CODE")]
        exclude_status: Vec<u16>,

        /// Accept invalid TLS certificates
        #[arg(long, default_value_t = false)]
        insecure: bool,

        /// JSON config file; command-line flags override its values
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short = 'o', long, default_value = "./results")]
        out: PathBuf,

        /// Re-render outputs from an existing JSONL instead of probing
        #[arg(long, value_name = "JSONL")]
        resume: Option<PathBuf>,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
