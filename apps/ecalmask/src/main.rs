//! # ecalmask
//!
//! Channel and tower masking for ECAL data-quality monitoring.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │              apps/ecalmask (THE BINARY)            │
//! │                                                    │
//! │   ┌─────────────┐          ┌─────────────┐         │
//! │   │    CLI      │          │  HTTP API   │         │
//! │   │   (clap)    │          │   (axum)    │         │
//! │   └──────┬──────┘          └──────┬──────┘         │
//! │          └──────────┬─────────────┘                │
//! │                     ▼                              │
//! │             ┌───────────────┐                      │
//! │             │ ecalmask-core │                      │
//! │             │  (THE LOGIC)  │                      │
//! │             └───────────────┘                      │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Build a payload from a status sheet and store it
//! ecalmask import -i sheet.toml -o epoch.emsk -e 316000
//! ecalmask store-put -s conditions.redb -f 316000 -i epoch.emsk
//!
//! # Query
//! ecalmask -C conditions.redb -r 316500 channel -m 5 -x 3 -y 2 -b 0x1
//! ecalmask -C epoch.emsk scan -m 4 -s endcap -b all
//!
//! # Serve
//! ecalmask -C epoch.emsk serve --port 8080
//! ```

use clap::Parser;
use ecalmask::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // ECALMASK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("ECALMASK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ecalmask=info,ecalmask_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
