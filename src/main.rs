use clap::Parser;
use pkm_bootstrap::cli::cmd_enums::{Cli, Commands};
use pkm_bootstrap::commands::{install, list, status, uninstall, version};
use pkm_bootstrap::error::{BootstrapError, StageError};
use pkm_bootstrap::{log_debug, log_error, logger};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug);
    log_debug!("[Main] {:?}", cli.command);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Install(args) => install::run(config, args),
        Commands::Uninstall { root, yes } => uninstall::run(config, root.as_deref(), yes),
        Commands::Status { json, root } => status::run(config, root.as_deref(), json),
        Commands::List { index_url } => list::run(config, index_url.as_deref()),
        Commands::Version => {
            version::run();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Domain errors already carry their cause in the message.
            let code = if let Some(stage_err) = err.downcast_ref::<StageError>() {
                log_error!("{}", stage_err);
                stage_err.exit_code()
            } else if let Some(domain) = err.downcast_ref::<BootstrapError>() {
                log_error!("{}", domain);
                domain.exit_code()
            } else {
                log_error!("{:#}", err);
                1
            };
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
