//! `contextfit budget` — Fit a session and print its token budget.

use contextfit_core::OutputChannel;
use contextfit_session::fit_session;
use contextfit_telemetry::BudgetSnapshot;

use super::{build_factory, load_config, session_options};
use crate::SessionArgs;

pub fn run(args: &SessionArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let options = session_options(&config, args);
    let factory = build_factory(&config);

    let session = fit_session(&factory, &options, OutputChannel::discard())?;
    let snapshot = session.snapshot();

    if json {
        println!("{snapshot}");
        return Ok(());
    }

    print_summary(snapshot, options.write_tokens);
    if !session.dropped().is_empty() {
        println!();
        println!("  Dropped to fit: {}", session.dropped().join(", "));
    }

    Ok(())
}

fn print_summary(snapshot: &BudgetSnapshot, reserve: usize) {
    println!("📊 Context Budget — {}", snapshot.model_name);
    println!("─────────────────────────────────────────────────────");
    println!("{:<32} {:>10} {:>10}", "Part", "Tokens", "Cost");
    println!("{:<32} {:>10} ${:>9.6}", "system", snapshot.system_tokens, snapshot.system_token_cost);
    println!("{:<32} {:>10} ${:>9.6}", "chat", snapshot.chat_tokens, snapshot.chat_token_cost);
    println!(
        "{:<32} {:>10} ${:>9.6}",
        "repo map", snapshot.repo_map_tokens, snapshot.repo_map_token_cost
    );
    for record in snapshot.writable().chain(snapshot.readonly()) {
        let label = if record.readonly {
            format!("{} (read-only)", record.name)
        } else {
            record.name.clone()
        };
        println!("{:<32} {:>10} ${:>9.6}", label, record.tokens, record.cost);
    }
    println!("─────────────────────────────────────────────────────");
    println!("{:<32} {:>10} ${:>9.6}", "total", snapshot.total_tokens, snapshot.total_cost);
    println!("{:<32} {:>10}", "max input", snapshot.max_tokens);
    println!("{:<32} {:>10}", "remaining", snapshot.remaining_tokens);

    let status = if snapshot.fits(reserve) { "✅" } else { "⛔ SHORT" };
    println!("{:<32} {:>10} {}", "reply reserve", reserve, status);
}
