//! Bitemporal reconstruction engine for a national administrative
//! subdivision registry: given a present-day roster and a chronological
//! log of legal modifications, rebuilds the full versioned history of
//! every administrative identity.

pub mod actions;
pub mod collection;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod record;
pub mod temporal;
pub mod town;

pub use collection::TownCollection;
pub use error::{DbError, Result};
pub use record::{ModificationKind, ModificationRecord};
pub use town::TownVersion;

/// Runtime configuration for a single reconstruction run.
#[derive(Debug, Clone)]
pub struct Config {
    pub towns_path: std::path::PathBuf,
    pub history_path: std::path::PathBuf,
    pub output_path: std::path::PathBuf,
    /// Escalate ingestion warnings (e.g. a row with an unrecognized
    /// modification tag) to hard errors.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            towns_path: "towns.csv".into(),
            history_path: "history.csv".into(),
            output_path: "output.csv".into(),
            strict: false,
        }
    }
}

/// Runs the full pipeline: load, dispatch the whole history, sort, and
/// return the resulting collection.
pub fn run(config: &Config) -> Result<TownCollection> {
    let mut towns = ingest::load_towns(&config.towns_path)?;
    let history = ingest::load_history(&config.history_path, config.strict)?;
    dispatch::compute(&mut towns, &history)?;
    Ok(towns)
}
