//! restsync command-line entry point
//!
//! Exit status: 0 when every entity completed without a recorded failure,
//! 1 when any failure was recorded, 2 on a fatal error.

mod cli;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use restsync_core::{EndpointRegistry, EntitySynchronizer};
use restsync_domain::{EntityState, RunReport};
use restsync_infra::config::{self, resolve_token_config_path};
use restsync_infra::{
    ApiGateway, CredentialManager, DbManager, FileRefreshStateStore, SqliteUpsertStore,
};
use tracing::{error, info, warn};

use crate::cli::Cli;

const EXIT_FAILURES: u8 = 1;
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(err) = logging::init(cli.log_format) {
        eprintln!("{err:#}");
        return ExitCode::from(EXIT_FATAL);
    }

    match run(cli).await {
        Ok(report) => exit_code(&report),
        Err(err) => {
            error!(error = format!("{err:#}"), "Sync run aborted");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunReport> {
    let config = config::load(cli.config).context("failed to load sync configuration")?;
    let token_path = resolve_token_config_path(cli.token_config);
    info!(token_config = %token_path.display(), "Using token configuration");

    let db = DbManager::new(&config.database).context("failed to open database")?;
    db.health_check().context("database health check failed")?;
    info!(database = %db.path().display(), schema = db.schema(), "Database ready");

    let registry =
        Arc::new(EndpointRegistry::from_config(&config).context("invalid endpoint configuration")?);
    let state = Arc::new(FileRefreshStateStore::new(token_path));
    let credentials = Arc::new(CredentialManager::new(state)?);
    let gateway = ApiGateway::from_config(Arc::clone(&registry), credentials, &config.http)?;
    let store = SqliteUpsertStore::new(Arc::new(db));

    let synchronizer = EntitySynchronizer::new(
        registry,
        Arc::new(gateway),
        Arc::new(store),
        Arc::new(config.table_mapping),
    );

    let report = if cli.entities.is_empty() {
        synchronizer.run().await?
    } else {
        synchronizer.run_selected(&cli.entities).await?
    };
    Ok(report)
}

fn exit_code(report: &RunReport) -> ExitCode {
    for outcome in &report.outcomes {
        for failure in &outcome.failures {
            warn!(
                entity = %outcome.entity,
                scope = ?failure.scope,
                error = %failure.error,
                "Recorded failure"
            );
        }
    }

    info!(
        completed = report.count_state(EntityState::Completed),
        skipped = report.count_state(EntityState::Skipped),
        aborted = report.count_state(EntityState::Aborted),
        upserted = report.total_upserted(),
        failures = report.total_failures(),
        "restsync finished"
    );

    if report.has_failures() {
        ExitCode::from(EXIT_FAILURES)
    } else {
        ExitCode::SUCCESS
    }
}
