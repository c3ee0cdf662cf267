use wxapkg_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    let target = logging::init();
    tracing::debug!("logging to {}", target);

    if let Err(err) = CliCommand::run_from_args() {
        tracing::error!("{:#}", err);
        eprintln!("wxapkg error: {:#}", err);
        std::process::exit(1);
    }
}
