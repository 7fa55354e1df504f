//! `contextfit doctor` — Diagnose setup.

use contextfit_config::AppConfig;

use super::build_catalog;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 contextfit Doctor — Setup Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");
                Some(config)
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
                None
            }
        }
    } else {
        println!("  ❌ No config file — run `contextfit onboard`");
        issues += 1;
        AppConfig::load().ok()
    };

    if let Some(config) = &config {
        if config.has_api_key() {
            println!("  ✅ API key configured");
        } else {
            println!("  ⚠️  No API key configured — add api_key to config.toml");
            issues += 1;
        }

        if build_catalog(config).lookup(&config.default_model).is_some() {
            println!("  ✅ Model metadata known for {}", config.default_model);
        } else {
            println!(
                "  ⚠️  No metadata for {} — budgets will read as zero; add a [models] override",
                config.default_model
            );
            issues += 1;
        }

        if config.session.root.is_dir() {
            println!("  ✅ Session root exists");
        } else {
            println!(
                "  ⚠️  Session root {} missing — run `contextfit onboard`",
                config.session.root.display()
            );
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
