//! Replays a SQL file statement by statement.
//!
//! Usage: `run-migration <file.sql>`. A failing statement is logged and the
//! replay goes on; the exit status is non-zero if any statement failed.

use std::{env, fs, process::ExitCode};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use leavedesk::{db::init_db, utils::sql_script::split_statements};
use tracing::{error, info};

/// First line of a statement, for the log.
fn summary(statement: &str) -> &str {
    statement.lines().next().unwrap_or_default().trim()
}

async fn run(path: &str) -> Result<usize> {
    let script = fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = init_db(&database_url, 1)
        .await
        .context("failed to connect to the database")?;

    let statements = split_statements(&script);
    info!(file = path, count = statements.len(), "Running migration");

    let mut failed = 0;
    for (i, statement) in statements.iter().enumerate() {
        match sqlx::query(statement).execute(&pool).await {
            Ok(done) => info!(
                statement = i + 1,
                rows = done.rows_affected(),
                sql = summary(statement),
                "Statement applied"
            ),
            Err(e) => {
                failed += 1;
                error!(statement = i + 1, sql = summary(statement), error = %e, "Statement failed");
            }
        }
    }
    Ok(failed)
}

#[actix_web::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: run-migration <file.sql>");
        return ExitCode::from(2);
    };

    match run(&path).await {
        Ok(0) => {
            info!("Migration finished");
            ExitCode::SUCCESS
        }
        Ok(failed) => {
            error!(failed, "Migration finished with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Migration aborted");
            ExitCode::FAILURE
        }
    }
}
