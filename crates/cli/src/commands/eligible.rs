//! `classbatch eligible` — List students waiting for a class.

use classbatch_core::eligibility::eligible_students;
use std::path::Path;

use super::{load_config, open_store};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;

    let students = eligible_students(&store, &config.eligibility).await?;

    println!("🎓 Eligible students: {}", students.len());
    if !students.is_empty() {
        let ids: Vec<String> = students.iter().map(ToString::to_string).collect();
        println!("   {}", ids.join(", "));
    }

    Ok(())
}
