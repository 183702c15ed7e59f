//! `vendorfetch`: download prebuilt library bundles and relocate them for a
//! build toolchain.

mod cli;
mod commands;
mod tracing;

use crate::cli::parse;
use crate::commands::Command;
use crate::tracing::{TracingConfig, init_tracing};
use vendorfetch_core::Config;
use vendorfetch_core::download::install_crypto_provider;

#[allow(clippy::print_stderr)]
fn main() -> miette::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = parse();

    init_tracing(TracingConfig {
        format: cli.tracing_format(),
        level: cli.level.into(),
        ..TracingConfig::default()
    })?;

    // reqwest is built without a bundled rustls provider
    install_crypto_provider();

    let mut config = Config::load(cli.config.as_deref())?;
    let command: Command = cli.command.into();
    command.apply_overrides(&mut config);

    commands::execute(&command, &config)?;
    Ok(())
}
