use colored::*;
use std::env;
use std::process;
use stratum::{CommandExit, StratumCli};

fn main() {
    let args: Vec<String> = env::args().collect();
    let cli = StratumCli::new();

    if let Err(e) = cli.run(args) {
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        if let Some(exit) = e.downcast_ref::<CommandExit>() {
            if !exit.message.is_empty() {
                eprintln!("{}", exit.message);
            }
            process::exit(exit.code);
        }
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
