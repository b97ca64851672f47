#[path = "woo-notify/app.rs"]
mod app;
#[path = "woo-notify/cli.rs"]
mod cli;
#[path = "woo-notify/driver.rs"]
mod driver;

use std::error::Error as StdError;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = cli::Cli::parse_args();
    match app::run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            std::process::ExitCode::from(1)
        }
    }
}

fn report_error(err: &woo_notify::error::Error) {
    eprintln!("Error: {err}");
    let mut source: Option<&dyn StdError> = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
