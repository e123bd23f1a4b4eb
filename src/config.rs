// In: src/config.rs

//! The single source of truth for spritefetch runtime configuration.
//!
//! `SpriteConfig` is created once at the application boundary (from the JSON
//! file named by `SPRITEFETCH_CONFIG`, or from defaults) and then passed down
//! by reference to selection and rendering. Every field is optional in the
//! file; missing fields take the documented defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SpriteError;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "SPRITEFETCH_CONFIG";

//==================================================================================
// I. The Unified SpriteConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SpriteConfig {
    /// One render in `shiny_odds` uses the shiny palette.
    #[serde(default = "default_shiny_odds")]
    pub shiny_odds: u32,

    /// Text rows kept free below the sprite (prompt plus spacing).
    #[serde(default = "default_row_margin")]
    pub row_margin: u16,

    /// An external catalog file used instead of the embedded one.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Log level name (`"info"`, `"debug"`, ...). `RUST_LOG` takes precedence.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            shiny_odds: default_shiny_odds(),
            row_margin: default_row_margin(),
            catalog_path: None,
            log_level: None,
        }
    }
}

/// Helper for `serde` to provide a default for `shiny_odds`.
fn default_shiny_odds() -> u32 {
    16
}

/// Helper for `serde` to provide a default for `row_margin`.
fn default_row_margin() -> u16 {
    2
}

//==================================================================================
// II. Loading & Validation
//==================================================================================

impl SpriteConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SpriteError> {
        let config: SpriteConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, SpriteError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Loads the file named by `SPRITEFETCH_CONFIG`, or returns defaults when
    /// the variable is unset or empty.
    pub fn from_env() -> Result<Self, SpriteError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => {
                log::info!("Loading config from {}", Path::new(&path).display());
                Self::from_file(Path::new(&path))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), SpriteError> {
        if self.shiny_odds == 0 {
            return Err(SpriteError::Config(
                "shiny_odds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
