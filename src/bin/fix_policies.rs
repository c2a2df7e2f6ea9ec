//! Rebuilds the row-level security policies in one transaction.
//!
//! Every existing policy on the application tables is dropped, the
//! `SECURITY DEFINER` helpers are (re)created and the policies are recreated
//! on top of them, so no policy on `users` ever queries `users` itself.

use std::env;

use anyhow::{Context, Result, bail};
use dotenvy::dotenv;
use leavedesk::{db::init_db, utils::sql_script::split_statements};
use tracing::{error, info};

const POLICIES_SQL: &str = include_str!("../../sql/rls_policies.sql");

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = init_db(&database_url, 1)
        .await
        .context("failed to connect to the database")?;

    let statements = split_statements(POLICIES_SQL);
    if statements.is_empty() {
        bail!("policy script is empty");
    }
    info!(count = statements.len(), "Applying row level policies");

    let mut tx = pool.begin().await?;
    for (i, statement) in statements.iter().enumerate() {
        if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
            error!(statement = i + 1, error = %e, "Policy statement failed, rolling back");
            tx.rollback().await?;
            return Err(e).context(format!("statement {} failed", i + 1));
        }
    }
    tx.commit().await?;

    info!("Row level policies rebuilt");
    Ok(())
}
