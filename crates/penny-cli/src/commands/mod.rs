//! Command implementations

pub mod jobs;
pub mod serve;
pub mod status;
pub mod users;

use anyhow::Context;
use penny_core::Database;

/// Resolve the database path: `PENNY_DB`, or the platform data directory.
pub fn database_path() -> anyhow::Result<std::path::PathBuf> {
    if let Ok(path) = std::env::var("PENNY_DB") {
        return Ok(path.into());
    }
    let dir = dirs::data_dir()
        .context("no data directory; set PENNY_DB")?
        .join("penny");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("penny.db"))
}

/// Open (and migrate) the database.
pub fn open_database() -> anyhow::Result<Database> {
    let path = database_path()?;
    let db = Database::new(path.to_string_lossy().as_ref())
        .with_context(|| format!("opening database at {}", path.display()))?;
    Ok(db)
}
