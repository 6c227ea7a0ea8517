//! `classbatch status` — Show configuration and database summary.

use classbatch_config::AppConfig;
use classbatch_core::ClassStore;
use classbatch_core::eligibility::eligible_students;
use classbatch_core::registry::read_registry;
use std::path::Path;

use super::{load_config, open_store};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let allocation = &config.allocation;

    println!("🏫 classbatch Status");
    println!("==================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Database:       {}", config.database.redacted_url());
    println!("  Size bounds:    [{}, {}]", allocation.min_size, allocation.max_size);
    println!("  Educator:       {}", allocation.educator_id);
    println!("  Class prefix:   {:?}", allocation.class_name_prefix);
    println!(
        "  Cohort only:    {}",
        if config.eligibility.require_seed { "yes" } else { "no" }
    );
    println!(
        "  Measurements:   {} complete required",
        config.eligibility.required_measurements
    );
    println!(
        "  Excluded team:  {}",
        if config.eligibility.excluded_team_members.is_empty() {
            "(none)".to_string()
        } else {
            config.eligibility.excluded_team_members.join(", ")
        }
    );

    let config_file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);
    if config_file.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `classbatch init` first");
    }

    match open_store(&config).await {
        Ok(store) => {
            let naming = allocation.naming();
            let registry = read_registry(&store, &naming, allocation.min_size).await?;
            let waiting = eligible_students(&store, &config.eligibility).await?;
            println!("  ✅ Database reachable ({})", store.name());
            println!("     Generated classes:  {}", registry.classes.len());
            println!("     Below minimum:      {}", registry.reusable.len());
            println!("     Next sequence:      {}", registry.next_sequence);
            println!("     Waiting students:   {}", waiting.len());
        }
        Err(e) => println!("  ❌ {e}"),
    }

    Ok(())
}
