mod roster;
mod serve;

use anyhow::Result;
use console::style;
use std::path::PathBuf;
use tracing::info;

use crate::core::config::{ServiceConfig, default_config_path};
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Service")
        .command("serve", "Start the attendance API (default)")
        .print();

    GuideSection::new("Directory")
        .command("employees", "List registered employees")
        .command("companies", "List registered companies")
        .command("roster import <file>", "Append employees from a JSON array")
        .print();

    GuideSection::new("Flags")
        .text("--config <file>    Config file (default: ~/.punchclock/punchclock.toml)")
        .text("--host <host>      Bind address for serve")
        .text("--port <port>      Listen port for serve")
        .print();

    println!(
        "\n {} {} <command> [flags]\n",
        style("Usage:").bold(),
        style("punchclock").green()
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GlobalFlags {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Arguments that are not flags, in order.
    pub positional: Vec<String>,
}

pub(crate) fn parse_flags(args: &[String], start: usize) -> Result<GlobalFlags> {
    let mut flags = GlobalFlags::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    flags.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--host" => {
                if i + 1 < args.len() {
                    flags.host = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--port" => {
                if i + 1 < args.len() {
                    let port = args[i + 1]
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid --port value '{}'", args[i + 1]))?;
                    flags.port = Some(port);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            other => {
                flags.positional.push(other.to_string());
                i += 1;
            }
        }
    }
    Ok(flags)
}

async fn load_config(flags: &GlobalFlags) -> Result<ServiceConfig> {
    let path = flags.config.clone().unwrap_or_else(default_config_path);
    let mut config = ServiceConfig::load(&path).await?;
    crate::logging::init(&config.logging.level);
    if path.exists() {
        info!("Loaded configuration from {}", path.display());
    } else {
        info!("No {} found, using defaults.", path.display());
    }
    if let Some(host) = &flags.host {
        config.server.host = host.clone();
    }
    if let Some(port) = flags.port {
        config.server.port = port;
    }
    Ok(config)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (cmd, start) = match args.get(1).map(String::as_str) {
        Some(cmd) if !cmd.starts_with('-') => (cmd.to_string(), 2),
        _ => ("serve".to_string(), 1),
    };

    match cmd.as_str() {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "serve" => {
            let flags = parse_flags(&args, start)?;
            let config = load_config(&flags).await?;
            serve::run_serve(config).await
        }
        "employees" => {
            let flags = parse_flags(&args, start)?;
            let config = load_config(&flags).await?;
            roster::list_employees(&config).await
        }
        "companies" => {
            let flags = parse_flags(&args, start)?;
            let config = load_config(&flags).await?;
            roster::list_companies(&config).await
        }
        "roster" => {
            let flags = parse_flags(&args, start)?;
            match flags.positional.as_slice() {
                [sub, file] if sub == "import" => {
                    let config = load_config(&flags).await?;
                    roster::import(&config, &PathBuf::from(file)).await
                }
                _ => {
                    print_error("Usage: punchclock roster import <file.json>");
                    Ok(())
                }
            }
        }
        other => {
            print_error(&format!("Unknown command '{}'", other));
            print_help();
            Ok(())
        }
    }
}
