//! Configuration loading and typed config structures for Entente matches.
//!
//! A match is configured from an optional `entente.yaml`. Every field has a
//! default, so an empty file (or no file at all) yields a playable match of
//! seven random players. Command-line flags are applied on top by the
//! binary.
//!
//! ```yaml
//! game:
//!   seed: 7
//!   max_year: 1910
//! negotiation:
//!   rounds: 2
//! decisions:
//!   timeout_ms: 30000
//! powers:
//!   FRANCE: llm
//!   ENGLAND: hold
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use entente_types::Power;
use serde::{Deserialize, Serialize};

/// Upper bound on negotiation rounds per movement phase.
pub const MAX_NEGOTIATION_ROUNDS: u32 = 10;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config: {message}")]
    Invalid {
        /// Which value is wrong and why.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level match configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Seed, limits, and victory threshold.
    #[serde(default)]
    pub game: GameConfig,

    /// Negotiation round settings.
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    /// Decision-maker call settings.
    #[serde(default)]
    pub decisions: DecisionConfig,

    /// Controller per power. Powers not listed use [`Controller::default`].
    #[serde(default)]
    pub powers: BTreeMap<Power, Controller>,
}

impl MatchConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserialises to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });
        if self.negotiation.rounds > MAX_NEGOTIATION_ROUNDS {
            return invalid(format!(
                "negotiation.rounds is {}, at most {MAX_NEGOTIATION_ROUNDS} allowed",
                self.negotiation.rounds
            ));
        }
        if self.negotiation.history_limit == 0 {
            return invalid("negotiation.history_limit must be at least 1".to_owned());
        }
        if self.negotiation.max_message_chars == 0 {
            return invalid("negotiation.max_message_chars must be at least 1".to_owned());
        }
        if self.decisions.timeout_ms == 0 {
            return invalid("decisions.timeout_ms must be at least 1".to_owned());
        }
        if self.game.victory_centers == 0 {
            return invalid("game.victory_centers must be at least 1".to_owned());
        }
        Ok(())
    }

    /// The controller assigned to `power`.
    pub fn controller_for(&self, power: Power) -> Controller {
        self.powers.get(&power).copied().unwrap_or_default()
    }

    /// Assign `controller` to every power.
    pub fn set_all_controllers(&mut self, controller: Controller) {
        for power in Power::ALL {
            self.powers.insert(power, controller);
        }
    }
}

/// Seed, limits, and victory threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seed for the random decision-makers.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Stop after this many resolved phases. Zero means no limit.
    #[serde(default)]
    pub max_phases: u32,

    /// Stop once a phase of a later year is reached. Zero means no limit.
    #[serde(default)]
    pub max_year: u16,

    /// Supply centres needed for a solo victory.
    #[serde(default = "default_victory_centers")]
    pub victory_centers: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_phases: 0,
            max_year: 0,
            victory_centers: default_victory_centers(),
        }
    }
}

/// Negotiation round settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationConfig {
    /// Maximum negotiation rounds before each movement phase.
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Press messages shown to a power, most recent last.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Longest accepted message body, in characters.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            history_limit: default_history_limit(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

/// Decision-maker call settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Per-power bounded wait for one decision-maker call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl DecisionConfig {
    /// The per-power deadline as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Which decision-maker plays a power.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Controller {
    /// Holds every unit and never negotiates.
    Hold,
    /// Picks uniformly among legal options.
    #[default]
    Random,
    /// Asks a generative language model.
    Llm,
}

impl core::str::FromStr for Controller {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hold" => Ok(Self::Hold),
            "random" => Ok(Self::Random),
            "llm" => Ok(Self::Llm),
            other => Err(ConfigError::Invalid {
                message: format!("unknown controller '{other}' (expected hold, random, or llm)"),
            }),
        }
    }
}

const fn default_seed() -> u64 {
    42
}

const fn default_victory_centers() -> usize {
    18
}

const fn default_rounds() -> u32 {
    3
}

const fn default_history_limit() -> usize {
    50
}

const fn default_max_message_chars() -> usize {
    2000
}

const fn default_timeout_ms() -> u64 {
    60_000
}
