//! Demo command - manage demo mode
//!
//! Demo mode points the context at a separate database file so
//! experimenting with imports never touches real data.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_app_dir;
use bucketeer_core::config::Config;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let app_dir = get_app_dir();
    std::fs::create_dir_all(&app_dir)?;
    let mut config = Config::load(&app_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&app_dir)?;
            println!("{}", "Demo mode enabled".green());
            println!("Imports now write to a separate demo database.");
            Ok(())
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&app_dir)?;
            println!("{}", "Demo mode disabled".yellow());
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            Ok(())
        }
    }
}
