// SPDX-License-Identifier: Apache-2.0
mod cli;

use std::process::ExitCode as ProcessExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::Cli;
use core_bootstrap::{ExitCode, StartupError, Wiring};
use core_workflow::RouterInput;

#[tokio::main]
async fn main() -> ProcessExitCode {
    init_logging();

    let cli = Cli::parse();

    let mut config = match core_config::load(cli.config.as_deref()).map_err(StartupError::from) {
        Ok(config) => config,
        Err(err) => return fail(&err),
    };
    if let Some(model) = cli.model {
        config.model.planner_model = model;
    }
    if let Some(mcp_config) = cli.mcp_config {
        config.mcp.config_path = mcp_config;
    }

    let wiring = match Wiring::init(&config).await {
        Ok(wiring) => wiring,
        Err(err) => return fail(&err),
    };

    let exit_code = run_loop(&wiring).await;
    wiring.shutdown().await;
    ProcessExitCode::from(exit_code.as_i32() as u8)
}

/// Reads lines from stdin and feeds each one to the router until EOF
/// (normal shutdown) or Ctrl-C (interrupt). §10: no terminal rendering,
/// autocomplete, or slash-command parsing here — just the turn loop.
async fn run_loop(wiring: &Wiring) -> ExitCode {
    let router = wiring.router();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => {
                        if line.is_empty() {
                            continue;
                        }
                        let turn = router.route(RouterInput::Line(line)).await;
                        println!("{}", turn.text);
                    }
                    Ok(None) => return ExitCode::Normal,
                    Err(err) => {
                        tracing::error!(target: "OTHER", error = %err, "stdin read failed");
                        return ExitCode::StartupFailure;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                return ExitCode::Interrupt;
            }
        }
    }
}

fn fail(err: &StartupError) -> ProcessExitCode {
    tracing::error!(target: "ERROR_TRACEBACK", error = %err, "startup failed");
    eprintln!("aria: startup failed: {err}");
    ProcessExitCode::from(ExitCode::from(err).as_i32() as u8)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(std::io::stderr)).try_init();
}
