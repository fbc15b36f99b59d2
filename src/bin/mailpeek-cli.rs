#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI that runs one unseen-mail scan and prints the JSON result

use clap::Parser;
use mailpeek::{MailPeek, ScanConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailpeek-cli")]
#[command(about = "Report unseen mail across configured IMAP accounts as JSON")]
struct Args {
    /// Shared secret authorising the scan
    #[arg(long, env = "MAILPEEK_TOKEN")]
    token: Option<String>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ScanConfig::from_env()?;
    let peek = MailPeek::new(config);

    let result = peek.scan(args.token.as_deref()).await;

    if args.pretty {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.to_json()?);
    }

    Ok(())
}
