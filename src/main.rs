//! connectivity-guard
//!
//! Keeps a DNS record pointed at a reachable server. The primary is probed
//! on a fixed interval; after a bounded number of failed reconnect attempts
//! the record is switched to the backup, and switched back once the primary
//! answers again.
//!
//! ```text
//!   probe cycle ──verdicts──▶ monitor actor ──intent──▶ DNS provider
//!        ▲                        │   │
//!        └────start/stop──────────┘   └──events──▶ notification queue ──▶ webhook
//! ```

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "connectivity-guard")]
#[command(about = "DNS failover watchdog for a primary/backup server pair", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/guard.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    connectivity_guard::lifecycle::run(cli.config).await
}
