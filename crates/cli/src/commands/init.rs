//! `classbatch init` — First-time setup.

use classbatch_config::AppConfig;
use std::path::Path;

use super::{load_config, open_store};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let default_path = AppConfig::config_path();
    let path = config_path.unwrap_or(&default_path);

    println!("🏫 classbatch — First-Time Setup");
    println!("================================\n");

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        } else {
            println!("  Config directory exists: {}", dir.display());
        }
    }

    if path.exists() {
        println!("⚠️  Config already exists at: {}", path.display());
    } else {
        std::fs::write(path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", path.display());
    }

    let config = load_config(Some(path))?;
    if let Some(dir) = sqlite_parent_dir(&config.database.url) {
        std::fs::create_dir_all(dir)?;
    }

    let _store = open_store(&config).await?;
    println!("✅ Database ready: {}", config.database.redacted_url());

    println!("\n🎉 Setup complete! Run `classbatch allocate --dry-run` to preview a run.\n");

    Ok(())
}

/// Directory holding a file-backed SQLite database, if the URL names one.
fn sqlite_parent_dir(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}
