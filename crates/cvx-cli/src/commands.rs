use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use cvx_server::{CivilytixServer, ServerConfig};
use cvx_types::{TicketMinter, UuidMinter};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Config(args) => cmd_config(args),
        Command::Mint(args) => cmd_mint(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    println!(
        "{} Civilytix on {} (production: {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        config.gate.production.to_string().cyan(),
    );
    if let Some(path) = &config.storage.snapshot_path {
        println!("  Snapshot: {}", path.display().to_string().blue());
    } else {
        println!("  Snapshot: {}", "none (in-memory only)".dimmed());
    }
    if config.enable_admin_routes {
        println!("  Admin routes: {}", "enabled".yellow());
    }

    let server = CivilytixServer::open(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server.serve())?;
    println!("{} Server stopped.", "✓".green());
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    config.validate()?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn cmd_mint(args: MintArgs) -> anyhow::Result<()> {
    let minter = UuidMinter;
    for _ in 0..args.count {
        println!("{}", minter.mint().as_str().yellow());
    }
    Ok(())
}
