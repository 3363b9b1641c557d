use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::catalog::Catalog;
use crate::error::SimResult;

/// Runtime configuration loaded from environment variables.
/// Simulation content (rules, templates, tuning) lives in the TOML [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    /// Catalogue file; the built-in catalogue is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Citizen snapshot JSON for the demo binary.
    pub citizens_path: Option<PathBuf>,
    /// Base seed. Each session derives its own seed from this and its operator code.
    pub seed: Option<u64>,
    /// Overrides the catalogue's hesitation threshold.
    pub hesitation_secs: Option<u64>,
}

impl SimConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            catalog_path: std::env::var("WATCHFLOOR_CATALOG").ok().map(PathBuf::from),
            citizens_path: std::env::var("WATCHFLOOR_CITIZENS").ok().map(PathBuf::from),
            seed: parse_opt("WATCHFLOOR_SEED")?,
            hesitation_secs: parse_opt("WATCHFLOOR_HESITATION_SECS")?,
        };

        config.log_summary();
        Ok(config)
    }

    /// Load the configured catalogue and apply env overrides.
    pub fn load_catalog(&self) -> SimResult<Catalog> {
        let mut catalog = match &self.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin()?,
        };
        if let Some(secs) = self.hesitation_secs {
            catalog.reluctance.hesitation_threshold_secs = secs;
        }
        Ok(catalog)
    }

    fn log_summary(&self) {
        fn show(path: &Option<PathBuf>) -> String {
            path.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<not set>".to_string())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  WATCHFLOOR_CATALOG: {}", show(&self.catalog_path));
        tracing::info!("  WATCHFLOOR_CITIZENS: {}", show(&self.citizens_path));
        tracing::info!(
            "  WATCHFLOOR_SEED: {}",
            self.seed.map(|s| s.to_string()).unwrap_or_else(|| "<random>".to_string())
        );
        tracing::info!(
            "  WATCHFLOOR_HESITATION_SECS: {}",
            self.hesitation_secs
                .map(|s| s.to_string())
                .unwrap_or_else(|| "<catalog>".to_string())
        );
    }
}

fn parse_opt<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        _ => Ok(None),
    }
}
