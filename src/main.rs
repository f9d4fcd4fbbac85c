use anyhow::Result;
use clap::ArgMatches;
use std::process::ExitCode;

use reset_admin::cli::{self, PasswordSource};
use reset_admin::function::TerminalConsole;
use reset_admin::{db, error, logger, reset, ui};
use reset_admin::{Config, Target};

fn main() -> ExitCode {
    let matches = cli::build().get_matches();

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::failure(&e);
            error::exit_code_for(&e)
        }
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = Config::load(matches)?;
    logger::init(&config.log_level);
    log::debug!("Loaded configuration: {config:?}");

    ui::banner(&config);
    let target = Target::from_config(&config);
    let source = PasswordSource::from_matches(matches);

    let result = db::open(&config).and_then(|mut store| {
        reset::execute(store.as_mut(), &config, source, &mut TerminalConsole)
    });

    // The audit trail must not turn a finished reset into a failure.
    let backend = config.database.backend();
    if let Err(e) = logger::audit_result(&config.audit_log, &target, backend, &result) {
        log::warn!("Could not write audit log: {e:#}");
    }

    let outcome = result?;
    ui::summary(&outcome);
    Ok(())
}
