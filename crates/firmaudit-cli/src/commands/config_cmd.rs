//! `firmaudit config` -- display resolved configuration.
//!
//! # Examples
//!
//! ```text
//! firmaudit config show
//! firmaudit config show --config ./audit.json
//! ```

use firmaudit_types::PipelineConfig;

/// Display the resolved configuration as formatted JSON.
pub fn config_show(config: &PipelineConfig) -> anyhow::Result<()> {
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &PipelineConfig) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_renders_snake_case_json() {
        let json = render(&PipelineConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["timeout_secs"], 120);
        assert_eq!(value["stages"]["stage_1_gather_details"], "gemini");
        assert_eq!(value["providers"].as_array().unwrap().len(), 5);
    }
}
