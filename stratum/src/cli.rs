use crate::{create_runtime_config, PluginRegistry};
use anyhow::Result;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Arg, ArgAction, ColorChoice, Command};

pub struct StratumCli {
    registry: PluginRegistry,
}

impl StratumCli {
    pub fn new() -> Self {
        let mut registry = PluginRegistry::new();
        registry.register_builtin_plugins();
        Self { registry }
    }

    pub fn build_app(&self) -> Command {
        let styles = Styles::styled()
            .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
            .usage(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
            .literal(AnsiColor::BrightWhite.on_default())
            .placeholder(AnsiColor::BrightYellow.on_default())
            .error(AnsiColor::BrightRed.on_default() | Effects::BOLD)
            .valid(AnsiColor::BrightGreen.on_default())
            .invalid(AnsiColor::BrightRed.on_default());

        let app = Command::new("stratum")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Validate and repair the layered module structure of a multi-module project")
            .styles(styles)
            .color(ColorChoice::Auto)
            .disable_help_subcommand(true)
            .subcommand_precedence_over_arg(true)
            .disable_version_flag(true);

        self.registry.build_cli(app).arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .action(ArgAction::Version)
                .help("Print version information"),
        )
    }

    pub fn run(&self, args: Vec<String>) -> Result<()> {
        init_logging();

        let matches = self.build_app().try_get_matches_from(args)?;
        let config = create_runtime_config()?;

        match matches.subcommand() {
            Some((command_name, sub_matches)) => {
                tracing::debug!("Running {} in {}", command_name, config.working_dir.display());
                self.registry.handle_command(command_name, sub_matches, &config)
            }
            None => {
                self.build_app().print_help()?;
                println!();
                Ok(())
            }
        }
    }
}

impl Default for StratumCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs go to stderr so that `--format json` output stays parseable.
/// `RUST_LOG` overrides the default `stratum=info` filter.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stratum=info"));

    // a second call (e.g. from tests) keeps the first subscriber
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
