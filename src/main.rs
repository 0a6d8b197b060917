use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use log::{error, info};
use promwrap::cli::Invocation;
use promwrap::config::load_config;
use promwrap::error::{Result, WrapperError, exit_code_for};
use promwrap::metrics::{MetricsRegistry, MetricsServer};
use promwrap::pattern::CounterSets;
use promwrap::process::{Supervisor, TerminationStatus};

#[tokio::main]
async fn main() -> ExitCode {
    let invocation = match Invocation::parse_from(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(WrapperError::Help(e)) => {
            // clap routes help to stdout and errors to stderr
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("promwrap: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    promwrap::init_logging(&invocation.args.log_level);

    match run(invocation).await {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Load configuration, bind the endpoint and run the child until it exits
async fn run(invocation: Invocation) -> Result<TerminationStatus> {
    let config_path = &invocation.args.config;
    let config = load_config(config_path)
        .with_context(|| format!("Loading configuration from {}", config_path.display()))?;
    info!(
        "Configuration loaded from {} ({} counter(s))",
        config_path.display(),
        config.counter_count()
    );

    let registry = Arc::new(MetricsRegistry::new());
    let counters = CounterSets::build(&config, &registry).context("Building pattern counters")?;

    let server = MetricsServer::bind(&invocation.args.addr, Arc::clone(&registry))
        .await
        .with_context(|| format!("Binding metrics endpoint {}", invocation.args.addr))?;
    let _server = server.spawn();

    let program = invocation.command.program().to_string();
    let status = Supervisor::new(invocation.command, counters)
        .run()
        .await
        .map_err(WrapperError::from)
        .with_context(|| format!("Supervising {}", program))?;

    Ok(status)
}
