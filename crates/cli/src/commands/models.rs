//! `contextfit models` — List the model catalog.

use super::{build_catalog, load_config};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let catalog = build_catalog(&config);
    let models = catalog.models();

    println!("💰 Model Catalog (per 1M tokens)");
    println!("──────────────────────────────────────────────────────────────────");
    println!("{:<40} {:>10} {:>10} {:>10}", "Model", "Input", "Output", "Context");
    println!("{:<40} {:>10} {:>10} {:>10}", "─────", "─────", "──────", "───────");

    for name in &models {
        if let Some(entry) = catalog.get(name) {
            let context = entry
                .max_input_tokens
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".into());
            println!(
                "{:<40} ${:>8.3} ${:>8.3} {:>10}",
                name, entry.input_per_m, entry.output_per_m, context
            );
        }
    }

    println!();
    println!("  {} models with metadata", models.len());

    Ok(())
}
