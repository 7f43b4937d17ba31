//! CLI command implementations for `firmaudit`.
//!
//! - [`run`] -- Pipeline execution and result rendering.
//! - [`status`] -- Provider and binding diagnostics.
//! - [`config_cmd`] -- Resolved configuration dump.

pub mod config_cmd;
pub mod run;
pub mod status;

use std::path::Path;

use firmaudit_core::{LoadedConfig, NativeEnvironment};

/// Exit code for failures before a pipeline could start.
pub const EXIT_SETUP_FAILURE: u8 = 2;

/// Load configuration from the given path override or via auto-discovery.
///
/// Discovery order after the override: `FIRMAUDIT_CONFIG`, then
/// `~/.firmaudit/config.json`, then built-in defaults.
pub async fn load_config(config_override: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    let loaded =
        firmaudit_core::load_config(config_override, &NativeEnvironment, dirs::home_dir()).await?;
    Ok(loaded)
}
