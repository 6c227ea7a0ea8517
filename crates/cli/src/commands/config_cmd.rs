//! `classbatch config` — Configuration management commands.

use classbatch_config::AppConfig;
use std::path::Path;

use super::load_config;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if config.allocation.min_size == config.allocation.max_size {
                warnings.push("min_size equals max_size; every new class gets the same size");
            }

            if !config.eligibility.require_seed {
                warnings.push("require_seed = false; students outside the cohort are eligible");
            }

            if !config.database.url.starts_with("sqlite:") {
                warnings.push("Only sqlite: database URLs are supported");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Database:      {}", config.database.redacted_url());
            println!(
                "   Size bounds:   [{}, {}]",
                config.allocation.min_size, config.allocation.max_size
            );
            println!("   Educator:      {}", config.allocation.educator_id);
            println!("   Prefix:        {:?}", config.allocation.class_name_prefix);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);
    println!("{}", path.display());
    Ok(())
}
