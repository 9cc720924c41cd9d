use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::error::{LeaseError, Result};

pub fn execute(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init => {
            let config_path = Config::create_sample()?;
            println!("Created sample config file at: {}", config_path.display());
            println!("\nSet the lease file to watch:");
            println!("  [source]");
            println!("  path = \"/path/to/leases.json\"");
        }
        ConfigCommand::Path => {
            let config_path = Config::config_file_path()?;
            println!("Config file path: {}", config_path.display());

            if config_path.exists() {
                println!("Status: File exists");

                match Config::load() {
                    Ok(config) => {
                        println!("Valid: Yes");
                        match &config.source.path {
                            Some(path) => println!("Lease file: {}", path.display()),
                            None => println!("Lease file: not set (use --file)"),
                        }
                    }
                    Err(e) => {
                        println!("Valid: No");
                        println!("Error: {}", e);
                    }
                }
            } else {
                println!("Status: File does not exist");
                println!("\nTo create a sample config file, run:");
                println!("  leasetimer config init");
            }
        }
        ConfigCommand::Show => {
            let config = Config::load()?;
            let toml_string = toml::to_string_pretty(&config)
                .map_err(|e| LeaseError::ConfigError(format!("Failed to serialize config: {}", e)))?;
            print!("{}", toml_string);
        }
    }

    Ok(())
}
