use anyhow::Result;
use colored::Colorize;

use crate::cli::OutputFormat;

pub fn print_type_names(names: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for name in names {
                println!("{name}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(names)?);
        }
    }
    Ok(())
}

pub fn print_fingerprint(fingerprint: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{fingerprint}"),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "fingerprint": fingerprint }))?
        ),
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
