//! Ops snapshot binary: reconciles the record collections once and logs a
//! per-payment summary. Useful for eyeballing the state of a deployment
//! without the dashboard UI.

use dotenvy::dotenv;
use orderdesk::config;
use orderdesk::core::join::{self, JoinOutcome};
use orderdesk::errors::Result;
use sea_orm::Database;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing as early as possible
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Env vars can also be set externally, so a missing .env is fine
    dotenv().ok();

    let settings = config::load_app_settings()
        .inspect_err(|e| error!("Failed to load application settings: {e}"))?;
    info!("Connecting to {}", settings.database_url);

    let db = Database::connect(&settings.database_url)
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    config::database::create_tables(&db).await?;

    let enriched = join::enrich_payments(&db).await?;
    info!("Reconciled {} payment(s)", enriched.len());

    for entry in &enriched {
        let payer = match &entry.payer {
            JoinOutcome::Fetched(profiles) => profiles
                .first()
                .map_or_else(|| "<no profile>".to_string(), |p| p.display_name.clone()),
            JoinOutcome::Unavailable => "<profiles unavailable>".to_string(),
        };
        match &entry.quotations {
            JoinOutcome::Fetched(quotations) => info!(
                "payment {} [{}] by {payer}: {:.2} across {} quotation(s)",
                entry.payment.reference_number,
                entry.payment.status,
                entry.payment.amount,
                quotations.len(),
            ),
            JoinOutcome::Unavailable => warn!(
                "payment {} [{}] by {payer}: quotations unavailable",
                entry.payment.reference_number, entry.payment.status,
            ),
        }
    }

    Ok(())
}
