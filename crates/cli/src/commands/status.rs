//! `contextfit status` — Show resolved configuration.

use contextfit_config::AppConfig;

use super::load_config;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let session = &config.session;

    println!("📐 contextfit Status");
    println!("===================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Session root:  {}", session.root.display());
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", config.default_model);
    println!("  API key:       {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Repo map:      {} tokens", session.repo_map_tokens);
    println!("  Reply reserve: {} tokens", session.write_tokens);
    println!("  Strict fit:    {}", if session.error_if_no_context { "yes" } else { "no" });
    println!("  Auto commit:   {}", if session.commit { "yes" } else { "no" });
    match session.max_reply_tokens {
        Some(max) => println!("  Reply cap:     {max} tokens"),
        None => println!("  Reply cap:     provider default"),
    }
    if !config.models.is_empty() {
        println!("  Overrides:     {} model(s)", config.models.len());
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `contextfit onboard` first");
    }

    Ok(())
}
