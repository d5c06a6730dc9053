use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grapnel")]
#[command(version)]
#[command(about = "Black-box gRPC service and method discovery", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan one target for exposed services and methods
    Scan {
        /// Target in host:port form
        target: String,

        /// Wordlist file (ServicePath[:M1,M2] and *GlobalMethod entries)
        #[arg(short, long)]
        wordlist: Option<PathBuf>,

        /// Extra methods file, one method per line, tried on every service
        #[arg(long)]
        methods: Option<PathBuf>,

        /// Concurrent probe workers
        #[arg(short, long, default_value = "10")]
        threads: usize,

        /// Per-call timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,

        /// Connect timeout in seconds
        #[arg(long, default_value = "5")]
        connect_timeout: u64,

        /// Overall per-target deadline in seconds
        #[arg(long)]
        deadline: Option<u64>,

        /// Disable pattern expansion of bare names
        #[arg(long)]
        no_patterns: bool,

        /// Disable the built-in brute-force word list
        #[arg(long)]
        no_brute: bool,

        /// Fuzz .vN. version segments
        #[arg(long)]
        fuzz_versions: bool,

        /// Highest version tried when fuzzing
        #[arg(long, default_value = "3")]
        max_version: u32,

        /// Cap methods probed per candidate (0 = unlimited)
        #[arg(long, default_value = "0")]
        method_limit: usize,

        /// Connect with TLS
        #[arg(long)]
        tls: bool,

        /// Demote INTERNAL responses to ambiguous
        #[arg(long)]
        strict: bool,

        /// One service path per line
        #[arg(long)]
        simple: bool,

        /// Emit the full result as JSON
        #[arg(long)]
        json: bool,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Probe explicit service/method paths
    Direct {
        /// Target in host:port form
        target: String,

        /// Path as Service/Method or Service.Method (split on the last dot)
        #[arg(long)]
        call: Option<String>,

        /// Comma-separated service list (crossed with --method)
        #[arg(long)]
        service: Option<String>,

        /// Comma-separated method list (crossed with --service)
        #[arg(long)]
        method: Option<String>,

        /// Per-call timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,

        /// Connect with TLS
        #[arg(long)]
        tls: bool,

        /// Demote INTERNAL responses to ambiguous
        #[arg(long)]
        strict: bool,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bulk-detect gRPC endpoints across many targets
    Detect {
        /// Single target (host[:port], port defaults to 443)
        #[arg(long)]
        target: Option<String>,

        /// File with one target per line; stdin is read when neither
        /// --target nor --targets is given
        #[arg(long)]
        targets: Option<PathBuf>,

        /// Concurrent detection workers
        #[arg(short, long, default_value = "50")]
        threads: usize,

        /// Per-target timeout in seconds
        #[arg(long, default_value = "3")]
        timeout: u64,

        /// Connect with TLS
        #[arg(long)]
        tls: bool,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
