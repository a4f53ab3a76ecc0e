//! Lookout - single-service health monitor
//!
//! Invoked once per scheduler tick: probes the service, restarts it at most
//! once per backoff window, and sends SMS alerts without paging on every run.

mod cli;
mod error;
mod logbook;
mod manifest;
mod radio;
mod sickbay;
mod watch;

use cli::{Cli, Commands};
use error::Result;
use logbook::{Logbook, MonitorState};
use radio::{LogOnly, TwilioSms};
use sickbay::{CommandRestart, HealthProbe, NoRestart, ServiceProbe};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use watch::{Herald, MonitorEngine, StatusReport};

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lookout=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lookout=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    match cli.action() {
        Commands::Check { dry_run } => check(cli, dry_run),

        Commands::Status { json } => {
            let config = manifest::load(&cli.config)?;
            let logbook = Logbook::new(cli.state_path());
            let report = StatusReport::new(&config.policy(), logbook.load(), unix_now());

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
            Ok(0)
        }

        Commands::Probe => {
            let config = manifest::load(&cli.config)?;
            let report = ServiceProbe::from_config(&config).probe();
            println!("{}", report);
            Ok(if report.healthy() { 0 } else { 1 })
        }

        Commands::Reset => {
            let logbook = Logbook::new(cli.state_path());
            let _lock = logbook.lock()?;
            logbook.save(&MonitorState::default())?;
            info!(path = %logbook.path().display(), "state reset");
            Ok(0)
        }

        Commands::Completion { shell } => {
            Cli::generate_completion(shell);
            Ok(0)
        }
    }
}

/// One monitoring cycle; returns the process exit code
fn check(cli: &Cli, dry_run: bool) -> Result<i32> {
    // Config problems must surface before the logbook is touched
    let config = manifest::load(&cli.config)?;
    let logbook = Logbook::new(cli.state_path());
    let probe = ServiceProbe::from_config(&config);
    let herald = Herald::from_config(&config);
    let now = unix_now();

    let outcome = if dry_run {
        info!("dry run: no SMS, no restart, state not saved");
        MonitorEngine::new(config.policy(), &probe, &LogOnly, &NoRestart, herald)
            .with_grace(Duration::ZERO)
            .evaluate(&logbook.load(), now)
    } else {
        let sms = TwilioSms::from_config(&config.twilio);
        let restart = CommandRestart::from_config(&config)?;
        MonitorEngine::new(config.policy(), &probe, &sms, &restart, herald)
            .with_grace(config.restart_grace())
            .run(&logbook, now)?
    };

    Ok(outcome.exit.code())
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
