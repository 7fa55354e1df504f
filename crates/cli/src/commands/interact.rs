//! `contextfit ask|architect|code` — Send one message through a fitted session.

use contextfit_core::InteractionKind;
use contextfit_session::send_with_fitted_session;

use super::{build_factory, load_config, session_options};
use crate::SessionArgs;

pub fn run(
    kind: InteractionKind,
    text: &str,
    args: &SessionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    if !config.has_api_key() {
        tracing::warn!(provider = %config.default_provider, "No API key configured");
    }
    let options = session_options(&config, args);
    let factory = build_factory(&config);

    let reply = send_with_fitted_session(&factory, &options, kind, text)?;
    print!("{reply}");

    Ok(())
}
