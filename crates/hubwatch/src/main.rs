mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hubwatch_core::{CloudApi, Controller};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = &cli.global;
    match cli.command {
        // Config commands don't need a cloud session
        Command::Config(args) => commands::config_cmd::handle(args, global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "hubwatch", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let session = config::resolve_session(global)?;
            let api = CloudApi::connect(session.cloud.clone()).await?;

            match cmd {
                // Long-running: owns its controller and the push stream
                Command::Watch(args) => commands::watch::handle(api, session, args, global).await,

                cmd => {
                    tracing::debug!(command = ?cmd, "dispatching command");
                    let controller_config = session.controller.clone();
                    let session = &session;
                    Controller::oneshot(api, controller_config, |controller| async move {
                        let result = commands::dispatch(cmd, &controller, session, global).await;
                        controller.api().logout();
                        Ok(result)
                    })
                    .await?
                }
            }
        }
    }
}
