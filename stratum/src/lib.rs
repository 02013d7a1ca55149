pub mod cli;
pub mod plugin;

pub use cli::StratumCli;
pub use plugin::PluginRegistry;
pub use stratum_core::{CommandExit, RuntimeConfig, StratumPlugin};

pub fn create_runtime_config() -> anyhow::Result<RuntimeConfig> {
    Ok(RuntimeConfig::new(std::env::current_dir()?))
}
