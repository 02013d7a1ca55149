use crate::fixer::{FixResult, FixStatus};
use crate::pipeline::{FixRun, FixSummary, FixerPipeline};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use stratum_core::{CommandExit, RuntimeConfig, StratumPlugin};
use stratum_rules::ProjectScanner;

pub struct FixPlugin {
    pipeline: FixerPipeline,
}

impl FixPlugin {
    pub fn new() -> Self {
        Self {
            pipeline: FixerPipeline::standard(),
        }
    }

    pub fn pipeline(&self) -> &FixerPipeline {
        &self.pipeline
    }

    fn handle_fix(&self, matches: &ArgMatches, config: &RuntimeConfig) -> Result<()> {
        let root = config.project_root(matches.get_one::<String>("path"))?;
        let profile = matches.get_one::<String>("profile").map(String::as_str);
        let dry_run = matches.get_flag("dry-run");
        let json = matches.get_one::<String>("format").map(String::as_str) == Some("json");
        let validator_config = config.load_config(&root, profile)?;

        let scanner = ProjectScanner::from_config(validator_config).context("Failed to load rule catalog")?;
        let catalog = scanner.engine().catalog();

        let rule_filter = match matches.get_one::<String>("rule") {
            Some(id) => Some(catalog.require(id)?.rule_id.clone()),
            None => None,
        };

        let report = scanner
            .scan(&root)
            .with_context(|| format!("Failed to scan {}", root.display()))?;
        let violations: Vec<_> = report
            .violations
            .into_iter()
            .filter(|v| rule_filter.as_deref().map(|id| v.rule_id == id).unwrap_or(true))
            .collect();

        if violations.is_empty() && !json {
            println!("{}", "Nothing to fix.".green());
            return Ok(());
        }

        let run = FixRun {
            project_root: &root,
            config: scanner.config(),
            catalog,
            dry_run,
        };
        let summary = self.pipeline.run(&run, &violations);
        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary, dry_run);
        }

        if summary.has_failures() {
            return Err(CommandExit {
                code: 1,
                message: format!("{} fix(es) failed and were rolled back", summary.count(FixStatus::Failed)),
            }
            .into());
        }
        Ok(())
    }
}

fn status_label(status: FixStatus) -> ColoredString {
    match status {
        FixStatus::Fixed => status.as_str().green().bold(),
        FixStatus::DryRun => status.as_str().cyan().bold(),
        FixStatus::Skipped => status.as_str().dimmed(),
        FixStatus::NotFixable => status.as_str().yellow().bold(),
        FixStatus::Failed => status.as_str().red().bold(),
    }
}

fn print_result(result: &FixResult) {
    println!(
        "{} {} {} {}",
        status_label(result.status),
        result.rule_id.bold(),
        result.target.cyan(),
        format!("({})", result.fixer).dimmed()
    );
    println!("   {}", result.message);
    for diff in &result.diffs {
        for line in diff.lines() {
            let styled = if line.starts_with("+++") || line.starts_with("---") {
                line.bold()
            } else if line.starts_with('+') {
                line.green()
            } else if line.starts_with('-') {
                line.red()
            } else if line.starts_with("@@") {
                line.cyan()
            } else {
                line.normal()
            };
            println!("   {}", styled);
        }
    }
}

fn print_summary(summary: &FixSummary, dry_run: bool) {
    for result in &summary.results {
        print_result(result);
    }

    println!(
        "\n{} {} fixed, {} skipped, {} not fixable, {} failed, {} dry-run",
        "Summary:".bold(),
        summary.count(FixStatus::Fixed),
        summary.count(FixStatus::Skipped),
        summary.count(FixStatus::NotFixable),
        summary.count(FixStatus::Failed),
        summary.count(FixStatus::DryRun)
    );
    if dry_run && summary.count(FixStatus::DryRun) > 0 {
        println!("Run without --dry-run to apply these changes");
    }
}

impl StratumPlugin for FixPlugin {
    fn name(&self) -> &str {
        "fix"
    }

    fn register_commands(&self, app: Command) -> Command {
        app.subcommand(
            Command::new("fix")
                .about("Repair violations, backing up every file before it changes")
                .arg(
                    Arg::new("path")
                        .value_name("PATH")
                        .help("Project root (defaults to the current directory)"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .short('n')
                        .help("Show the changes as diffs without writing anything")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("rule")
                        .long("rule")
                        .short('r')
                        .value_name("ID")
                        .help("Only fix violations of this rule"),
                )
                .arg(
                    Arg::new("profile")
                        .long("profile")
                        .short('p')
                        .value_name("PROFILE")
                        .help("Use .stratum.<PROFILE>.yaml instead of .stratum.yaml"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .value_name("FORMAT")
                        .value_parser(["text", "json"])
                        .default_value("text")
                        .help("Output format"),
                ),
        )
    }

    fn handle_command(&self, matches: &ArgMatches, config: &RuntimeConfig) -> Result<()> {
        self.handle_fix(matches, config)
    }
}

impl Default for FixPlugin {
    fn default() -> Self {
        Self::new()
    }
}
