//! `penny serve`: API server plus background jobs

use tracing::{info, warn};

use penny_core::ai::CategorizationPipeline;
use penny_core::mailer::Mailer;
use penny_server::scheduler::{self, JobsConfig};
use penny_server::AppState;

use crate::cli::ServeArgs;
use crate::commands::open_database;

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let db = open_database()?;

    let pipeline = CategorizationPipeline::from_env();
    if !pipeline.supports_receipts() {
        warn!("GEMINI_API_KEY not set; receipt scanning disabled, categorization degraded");
    }

    let mailer = Mailer::from_env();
    if mailer.is_none() {
        warn!("MAILER_API_KEY/MAILER_FROM not set; report and alert emails disabled");
    }

    let state = AppState::new(db, pipeline, mailer);
    scheduler::start(state.clone(), JobsConfig::from_env());

    let addr = format!("{}:{}", args.host, args.port);
    info!(addr = %addr, "starting penny server");
    penny_server::run_server(&addr, state).await
}
