pub mod budget;
pub mod doctor;
pub mod interact;
pub mod models;
pub mod onboard;
pub mod status;

use std::sync::Arc;

use contextfit_config::AppConfig;
use contextfit_engine::WorkspaceEngineFactory;
use contextfit_providers::build_from_config;
use contextfit_session::SessionOptions;
use contextfit_telemetry::{ModelCatalog, ModelEntry};

use crate::SessionArgs;

/// Load the configuration with a readable error.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The built-in catalog with the configured model overrides applied.
pub fn build_catalog(config: &AppConfig) -> ModelCatalog {
    let catalog = ModelCatalog::with_defaults();
    for (name, entry) in &config.models {
        catalog.set(
            name.clone(),
            ModelEntry {
                input_per_m: entry.input_per_m,
                output_per_m: entry.output_per_m,
                max_input_tokens: entry.max_input_tokens,
            },
        );
    }
    catalog
}

/// Engine factory over the configured backends.
pub fn build_factory(config: &AppConfig) -> WorkspaceEngineFactory {
    let backend = Arc::new(build_from_config(config));
    WorkspaceEngineFactory::new(backend, Arc::new(build_catalog(config)))
        .with_max_reply_tokens(config.session.max_reply_tokens)
}

/// Session options from the configured defaults and the command line.
pub fn session_options(config: &AppConfig, args: &SessionArgs) -> SessionOptions {
    let directory = config.session.resolve_directory(&args.dir);
    let model = args.model.clone().unwrap_or_else(|| config.default_model.clone());

    let mut options = SessionOptions::new(directory, model)
        .with_write_files(args.write.iter().cloned())
        .with_read_files(args.read.iter().cloned())
        .with_commit(config.session.commit)
        .with_repo_map_tokens(config.session.repo_map_tokens)
        .with_write_tokens(args.write_tokens.unwrap_or(config.session.write_tokens));
    if args.lenient || !config.session.error_if_no_context {
        options = options.lenient();
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(dir: &str) -> SessionArgs {
        SessionArgs {
            dir: PathBuf::from(dir),
            model: None,
            write: vec!["src/main.rs".into()],
            read: vec!["README.md".into(), "NOTES.md".into()],
            write_tokens: None,
            lenient: false,
        }
    }

    #[test]
    fn options_follow_config_defaults() {
        let mut config = AppConfig::default();
        config.session.root = PathBuf::from("/srv/repos");
        config.session.write_tokens = 2048;

        let options = session_options(&config, &args("project"));
        assert_eq!(options.directory, PathBuf::from("/srv/repos/project"));
        assert_eq!(options.model, config.default_model);
        assert_eq!(options.write_files, vec!["src/main.rs"]);
        assert_eq!(options.read_files, vec!["README.md", "NOTES.md"]);
        assert_eq!(options.write_tokens, 2048);
        assert!(options.error_if_no_context);
    }

    #[test]
    fn command_line_overrides_config() {
        let config = AppConfig::default();
        let mut a = args("/abs/project");
        a.model = Some("openai/gpt-4o".into());
        a.write_tokens = Some(100);
        a.lenient = true;

        let options = session_options(&config, &a);
        assert_eq!(options.directory, PathBuf::from("/abs/project"));
        assert_eq!(options.model, "openai/gpt-4o");
        assert_eq!(options.write_tokens, 100);
        assert!(!options.error_if_no_context);
    }

    #[test]
    fn lenient_config_makes_options_lenient() {
        let mut config = AppConfig::default();
        config.session.error_if_no_context = false;
        let options = session_options(&config, &args("p"));
        assert!(!options.error_if_no_context);
    }

    #[test]
    fn catalog_applies_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            [models."acme/tiny"]
            input_per_m = 2.0
            max_input_tokens = 8000
            "#,
        )
        .unwrap();
        let catalog = build_catalog(&config);
        let info = catalog.lookup("acme/tiny").unwrap();
        assert_eq!(info.max_tokens(), 8000);
        assert!((info.token_unit_cost() - 2.0e-6).abs() < 1e-12);
    }
}
