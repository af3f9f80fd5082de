// Entry point: logging setup, then hand off to the CLI.
//
// Logs go to stderr so stdout carries only report previews and `--json`
// output. `RUST_LOG` overrides the default `ads_report=info` filter.
use ads_report::cli::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "ads_report=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.run()
}
