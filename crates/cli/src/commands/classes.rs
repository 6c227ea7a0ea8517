//! `classbatch classes` — Show generated classes and their fill.

use classbatch_core::registry::read_registry;
use std::path::Path;

use super::{load_config, open_store};

pub async fn run(config_path: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;

    let naming = config.allocation.naming();
    let min_size = config.allocation.min_size;
    let registry = read_registry(&store, &naming, min_size).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }

    println!("🏫 Generated classes ({:?} prefix)", naming.prefix());
    println!("==================");
    if registry.classes.is_empty() {
        println!("  (none yet)");
    }
    for class in &registry.classes {
        let marker = if class.enrolled < min_size {
            "  ⚠️  below minimum, will be topped up"
        } else {
            ""
        };
        println!("  {:<24} {:>4} students{marker}", class.name, class.enrolled);
    }
    println!();
    println!("  Reusable:       {}", registry.reusable.len());
    println!("  Next sequence:  {}", registry.next_sequence);

    Ok(())
}
