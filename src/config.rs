//! Interaction configuration
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{InteractionError, InteractionResult};
use crate::value_objects::POSITION_EMOJI;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "GLOSSARY_DIALOG_CONFIG";

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// How positional and navigation signals are offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalStyle {
    /// Reactions added to the anchor message
    #[default]
    Reactions,
    /// Interactive buttons attached to the anchor message
    Buttons,
}

/// Tunables for pagination, wizards and confirmation gates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Items shown per result page
    pub page_size: usize,
    /// How long a result listing accepts selections
    pub selection_timeout_secs: u64,
    /// How long a confirmation gate waits for accept/reject
    pub confirmation_timeout_secs: u64,
    /// How long the wizard waits for each answer
    pub wizard_step_timeout_secs: u64,
    /// Reply that aborts a wizard at any step; the whole reply must equal it
    pub cancel_keyword: String,
    /// Reply meaning "no aliases" at the alias step
    pub no_aliases_keyword: String,
    /// Upper bound on a term description
    pub max_description_chars: usize,
    /// Maximum number of search results requested from the store
    pub search_limit: usize,
    /// Period of the background expiry sweep
    pub sweep_interval_secs: u64,
    /// Reactions or buttons
    pub signal_style: SignalStyle,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            selection_timeout_secs: 15 * 60,
            confirmation_timeout_secs: 15 * 60,
            wizard_step_timeout_secs: 10 * 60,
            cancel_keyword: "cancel".to_string(),
            no_aliases_keyword: "none".to_string(),
            max_description_chars: 1800,
            search_limit: 50,
            sweep_interval_secs: 30,
            signal_style: SignalStyle::Reactions,
        }
    }
}

impl InteractionConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> InteractionResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> InteractionResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        info!(path = %path.display(), "loaded interaction configuration");
        Ok(config)
    }

    /// Load from the file named by `GLOSSARY_DIALOG_CONFIG`, or `config.toml`.
    ///
    /// A missing file is not an error: defaults are used instead.
    pub fn from_env() -> InteractionResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if !Path::new(&path).exists() {
            info!(path = %path, "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Check invariants the controllers rely on
    pub fn validate(&self) -> InteractionResult<()> {
        if self.page_size == 0 || self.page_size > POSITION_EMOJI.len() {
            return Err(InteractionError::InvalidConfig(format!(
                "page_size must be between 1 and {}, got {}",
                POSITION_EMOJI.len(),
                self.page_size
            )));
        }
        if self.cancel_keyword.is_empty() {
            return Err(InteractionError::InvalidConfig(
                "cancel_keyword must not be empty".to_string(),
            ));
        }
        if self.selection_timeout_secs == 0
            || self.confirmation_timeout_secs == 0
            || self.wizard_step_timeout_secs == 0
        {
            return Err(InteractionError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.search_limit == 0 {
            return Err(InteractionError::InvalidConfig(
                "search_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn selection_timeout(&self) -> Duration {
        Duration::from_secs(self.selection_timeout_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn wizard_step_timeout(&self) -> Duration {
        Duration::from_secs(self.wizard_step_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
