use crate::cli::ConfigCommand;
use eyelabs_timer::config::Config;
use eyelabs_timer::error::Result;

pub fn execute(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init => {
            let config_path = Config::create_sample()?;
            println!("Created sample config file at: {}", config_path.display());
        }
        ConfigCommand::Path => {
            let config_path = Config::config_file_path()?;
            println!("Config file path: {}", config_path.display());

            if config_path.exists() {
                println!("Status: File exists");

                match Config::load() {
                    Ok(config) => {
                        println!("Valid: Yes");
                        println!("\nLabels:");
                        println!("  Upcoming: {}", config.labels.upcoming);
                        println!("  Active: {}", config.labels.active);
                        println!("  Ended: {}", config.labels.ended);
                        println!("Tick interval: {} ms", config.ticker.interval_ms);
                    }
                    Err(e) => {
                        println!("Valid: No");
                        println!("Error: {}", e);
                    }
                }
            } else {
                println!("Status: File does not exist");
                println!("\nTo create a sample config file, run:");
                println!("  eyelabs-timer config init");
            }
        }
    }

    Ok(())
}
