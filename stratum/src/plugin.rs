use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};
use std::collections::BTreeMap;
use stratum_core::{RuntimeConfig, StratumPlugin};
use stratum_fix::{FixPlugin, FixerPipeline};
use stratum_rules::ScanPlugin;

pub struct PluginRegistry {
    plugins: BTreeMap<String, Box<dyn StratumPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn StratumPlugin>) {
        let name = plugin.name().to_string();
        self.plugins.insert(name, plugin);
    }

    pub fn register_builtin_plugins(&mut self) {
        // scan reports which violations `fix` can repair
        let fixers = FixerPipeline::standard();
        self.register(Box::new(
            ScanPlugin::new().with_fixability(move |violation| fixers.mark_fixable(violation)),
        ));
        self.register(Box::new(FixPlugin::new()));
    }

    pub fn build_cli(&self, base_app: Command) -> Command {
        self.plugins
            .values()
            .fold(base_app, |app, plugin| plugin.register_commands(app))
    }

    pub fn handle_command(&self, command_name: &str, matches: &ArgMatches, config: &RuntimeConfig) -> Result<()> {
        match self.plugins.get(command_name) {
            Some(plugin) => plugin.handle_command(matches, config),
            None => Err(anyhow!("Unknown command: {}", command_name)),
        }
    }

    pub fn get_plugin(&self, name: &str) -> Option<&dyn StratumPlugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    pub fn list_plugins(&self) -> Vec<&str> {
        self.plugins.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = PluginRegistry::new();
        assert!(registry.get_plugin("scan").is_none());
        assert!(registry.list_plugins().is_empty());
    }

    #[test]
    fn test_builtin_plugins() {
        let mut registry = PluginRegistry::new();
        registry.register_builtin_plugins();
        assert_eq!(registry.list_plugins(), vec!["fix", "scan"]);

        let app = registry.build_cli(Command::new("stratum"));
        let names: Vec<&str> = app.get_subcommands().map(|c| c.get_name()).collect();
        assert!(names.contains(&"scan"));
        assert!(names.contains(&"fix"));
    }

    #[test]
    fn test_unknown_command() {
        let registry = PluginRegistry::new();
        let matches = Command::new("stratum").get_matches_from(vec!["stratum"]);
        let config = RuntimeConfig::new(std::env::temp_dir());
        let err = registry.handle_command("deploy", &matches, &config).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: deploy");
    }
}
