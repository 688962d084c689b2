use std::process::ExitCode;

use dealdesk_core::config::{AppConfig, LoadOptions, LogFormat};

fn main() -> ExitCode {
    init_tracing();
    dealdesk_cli::run()
}

fn init_tracing() {
    // Config problems are reported by the individual commands; fall back to
    // defaults here so logging never blocks startup.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}
