//! `firmaudit status` -- show provider and binding diagnostics.
//!
//! Discovers the active configuration, then prints the provider registry
//! (with whether each provider's API key is present) and the binding each
//! stage would resolve to right now. Nothing is called.
//!
//! # Example
//!
//! ```text
//! firmaudit status
//! firmaudit status --config ./audit.json
//! ```

use std::path::PathBuf;

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use firmaudit_core::credentials::key_var;
use firmaudit_core::{
    BindingPreview, CredentialLookup, EnvCredentials, ProviderRegistry, preview_bindings,
};
use firmaudit_llm::platform_endpoint;
use firmaudit_types::StageModels;

use super::load_config;

/// Arguments for the `firmaudit status` subcommand.
#[derive(Args)]
pub struct StatusArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the status command.
pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let loaded = load_config(args.config.as_deref()).await?;

    println!("firmaudit status");
    println!("================");
    println!();
    match &loaded.source {
        Some(path) => println!("Config: {}", path.display()),
        None => {
            println!("Config: not found");
            println!("  Searched: ~/.firmaudit/config.json");
            println!("  Set FIRMAUDIT_CONFIG env var to override");
            println!("  Using defaults");
        }
    }
    println!();

    let registry = ProviderRegistry::from_specs(loaded.config.providers.clone())?;
    let credentials = EnvCredentials::from_process(&registry);

    println!("Providers:");
    println!("{}", provider_table(&registry, &credentials));
    println!(
        "Enabled: {}",
        match registry.enabled_providers() {
            names if names.is_empty() => "none".to_string(),
            names => names.join(", "),
        }
    );
    println!();

    println!("Stage bindings:");
    println!("{}", binding_table(&preview_bindings(&registry, &loaded.config.stages)));
    print_unused_keys(&registry, &loaded.config.stages);
    Ok(())
}

fn provider_table(registry: &ProviderRegistry, credentials: &dyn CredentialLookup) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["NAME", "PLATFORM", "DEFAULT MODEL", "ENABLED", "KEY VAR", "KEY SET"]);

    for spec in registry.specs() {
        let platform = match platform_endpoint(&spec.platform) {
            Some(_) => spec.platform.clone(),
            None if spec.base_url.is_some() => format!("{} (custom)", spec.platform),
            None => format!("{} (unknown)", spec.platform),
        };
        table.add_row([
            spec.name.clone(),
            platform,
            spec.default_model.clone(),
            yes_no(spec.enabled).into(),
            key_var(spec).unwrap_or_else(|| "-".into()),
            yes_no(credentials.get(&spec.name).is_some()).into(),
        ]);
    }
    table
}

fn binding_table(previews: &[BindingPreview]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["STAGE", "CONFIGURED", "RESOLVES TO"]);

    for p in previews {
        let resolved = match &p.resolved {
            Ok(binding) => binding.to_string(),
            Err(err) => format!("{}: {err}", err.kind()),
        };
        table.add_row([
            format!("{}. {}", p.stage.number(), p.stage.label()),
            p.configured.clone(),
            resolved,
        ]);
    }
    table
}

/// Enabled providers no stage refers to.
fn print_unused_keys(registry: &ProviderRegistry, stages: &StageModels) {
    let unused: Vec<String> = registry
        .enabled_providers()
        .into_iter()
        .filter(|name| {
            !stages
                .iter()
                .any(|(_, spec)| spec.split(':').next().map(str::trim) == Some(name.as_str()))
        })
        .collect();
    if !unused.is_empty() {
        println!("Enabled but unused: {}", unused.join(", "));
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmaudit_core::StaticCredentials;

    #[test]
    fn provider_table_reports_key_presence() {
        let registry = ProviderRegistry::builtin();
        let creds = StaticCredentials::new().with("groq", "k");
        let rendered = provider_table(&registry, &creds).to_string();
        assert!(rendered.contains("GROQ_API_KEY"));
        assert!(rendered.contains("gemini-3-flash-preview"));
        assert!(rendered.contains("mistral-large-latest"));
    }

    #[test]
    fn binding_table_shows_errors_inline() {
        let registry = ProviderRegistry::builtin();
        let stages = StageModels::new("gemini", "openai", "groq", "nobody");
        let rendered = binding_table(&preview_bindings(&registry, &stages)).to_string();
        assert!(rendered.contains("gemini:gemini-3-flash-preview"));
        assert!(rendered.contains("ProviderDisabled"));
        assert!(rendered.contains("UnknownProvider"));
    }
}
