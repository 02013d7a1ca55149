use crate::scan::{ProjectScanner, ScanReport};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use stratum_core::{CommandExit, RuntimeConfig, Severity, StratumPlugin, Violation};

type FixabilityMarker = Box<dyn Fn(&mut Violation) + Send + Sync>;

pub struct ScanPlugin {
    marker: Option<FixabilityMarker>,
}

impl ScanPlugin {
    pub fn new() -> Self {
        Self { marker: None }
    }

    /// Lets the report flag violations that an automatic fixer can repair.
    pub fn with_fixability<F>(mut self, marker: F) -> Self
    where
        F: Fn(&mut Violation) + Send + Sync + 'static,
    {
        self.marker = Some(Box::new(marker));
        self
    }

    fn handle_scan(&self, matches: &ArgMatches, config: &RuntimeConfig) -> Result<()> {
        let root = config.project_root(matches.get_one::<String>("path"))?;
        let profile = matches.get_one::<String>("profile").map(String::as_str);
        let validator_config = config.load_config(&root, profile)?;
        let report_only = matches.get_flag("report-only") || validator_config.report_only;

        let scanner = ProjectScanner::from_config(validator_config).context("Failed to load rule catalog")?;
        let mut report = scanner
            .scan(&root)
            .with_context(|| format!("Failed to scan {}", root.display()))?;

        if let Some(marker) = &self.marker {
            report.violations.iter_mut().for_each(|v| marker(v));
        }

        match matches.get_one::<String>("format").map(String::as_str) {
            Some("json") => println!("{}", serde_json::to_string_pretty(&report)?),
            _ => print_report(&report),
        }

        let code = report.exit_code();
        if code != 0 && !report_only {
            return Err(CommandExit {
                code,
                message: format!(
                    "{} blocking violation(s) found",
                    report.violations.iter().filter(|v| v.severity.is_blocking()).count()
                ),
            }
            .into());
        }
        Ok(())
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".magenta().bold(),
        Severity::Error => "ERROR".red().bold(),
        Severity::Warning => "WARNING".yellow().bold(),
        Severity::Info => "INFO".blue().bold(),
    }
}

fn print_report(report: &ScanReport) {
    println!("\n{} {}", "Scanning:".bold(), report.root.display().to_string().cyan());
    println!("{}", "=".repeat(50));

    if report.is_clean() {
        println!("{} ({} modules)", "All rules passed!".green(), report.modules.len());
        return;
    }

    for violation in &report.violations {
        println!(
            "{} {} {}",
            severity_label(violation.severity),
            violation.rule_id.bold(),
            violation.target.cyan()
        );
        println!("   {}: {}", "Expected".dimmed(), violation.expected);
        println!("   {}: {}", "Found".dimmed(), violation.found);
        println!("   {}: {}", "Location".dimmed(), violation.location.display());
        if !violation.reason.is_empty() {
            println!("   {}: {}", "Why".dimmed(), violation.reason);
        }
        if !violation.fix.is_empty() {
            println!("   {}: {}", "Fix".dimmed(), violation.fix);
        }
        if violation.fixable {
            println!("   {} stratum fix can repair this", "→".green());
        }
    }

    println!(
        "\n{} {} module(s), {} critical, {} error(s), {} warning(s), {} info",
        "Summary:".bold(),
        report.modules.len(),
        report.count(Severity::Critical),
        report.count(Severity::Error),
        report.count(Severity::Warning),
        report.count(Severity::Info)
    );
}

impl StratumPlugin for ScanPlugin {
    fn name(&self) -> &str {
        "scan"
    }

    fn register_commands(&self, app: Command) -> Command {
        app.subcommand(
            Command::new("scan")
                .about("Validate a multi-module project against the layered architecture rules")
                .arg(
                    Arg::new("path")
                        .value_name("PATH")
                        .help("Project root (defaults to the current directory)"),
                )
                .arg(
                    Arg::new("profile")
                        .long("profile")
                        .short('p')
                        .value_name("PROFILE")
                        .help("Use .stratum.<PROFILE>.yaml instead of .stratum.yaml"),
                )
                .arg(
                    Arg::new("report-only")
                        .long("report-only")
                        .help("Always exit with status 0")
                        .action(ArgAction::SetTrue),
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
        self.handle_scan(matches, config)
    }
}

impl Default for ScanPlugin {
    fn default() -> Self {
        Self::new()
    }
}
