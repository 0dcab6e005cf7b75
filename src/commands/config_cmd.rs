use clap::{Args, Subcommand, ValueEnum};
use std::fs;

use crate::config::Config;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!("spool_dir: {}", config.spool_dir.value.display());
                        println!("  source: {}", config.spool_dir.source);
                        println!();

                        println!("first_delay_ms: {}", config.delays.first_delay_ms);
                        println!("repeat_delay_ms: {}", config.delays.repeat_delay_ms);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = Config::default_config_path();

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'docket config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let default_config = r#"# docket configuration

# Directory for stored documents (default: ~/.local/share/docket/data)
# data_dir: ~/.local/share/docket/data

# Directory for spooled, not-yet-flushed writes
# spool_dir: ~/.local/share/docket/spool

# Debounce delays for buffered writes
delays:
  first_delay_ms: 5000
  repeat_delay_ms: 3000
"#;
                fs::write(&config_path, default_config)?;

                println!("Created config file: {}", config_path.display());
                Ok(())
            }
        }
    }
}
