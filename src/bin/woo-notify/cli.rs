use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use humantime::parse_duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recent-purchase notifications for a storefront", long_about = None)]
pub struct Cli {
    /// Path to the TOML settings file.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON (needs `--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json_logs: bool,

    /// Explicit log filter (e.g. "woo_notify=debug").
    #[arg(long, value_name = "FILTER", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the page payload built from the store export.
    Payload(PayloadArgs),
    /// Run the notification cycle in the terminal.
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Pretty-print the JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    pub pretty: bool,

    /// Seed for the line-item picks.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Time between notifications (e.g. "4s").
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// How long each notification stays up.
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Stop after this many notifications.
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Seed for every random pick.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn preview_flags_parse_humantime() {
        let cli = match Cli::try_parse_from([
            "woo-notify",
            "preview",
            "--interval",
            "4s",
            "--cycles",
            "3",
            "--log-filter",
            "woo_notify=debug",
        ]) {
            Ok(cli) => cli,
            Err(err) => panic!("args should parse: {err}"),
        };
        assert_eq!(cli.log_filter.as_deref(), Some("woo_notify=debug"));
        let Command::Preview(args) = cli.command else {
            panic!("expected preview");
        };
        assert_eq!(args.interval, Some(Duration::from_secs(4)));
        assert_eq!(args.cycles, Some(3));
        assert!(args.duration.is_none());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["woo-notify"]).is_err());
    }
}
