//! infradiag CLI entry point.

use clap::Parser;
use infradiag::cli::{self, Cli, EXIT_FAILED};

fn main() {
    // Argument errors exit 2 from clap; everything past parsing exits 0 or 1.
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays clean. RUST_LOG wins over the flags.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.global.log_level())),
        )
        .init();

    let exit_code = match cli::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            EXIT_FAILED
        }
    };

    std::process::exit(exit_code);
}
