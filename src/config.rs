//! Loop configuration.
//!
//! [`LoopConfig`] can be built in code or read from a TOML or JSON document.
//! Missing fields take their defaults.
//!
//! ```toml
//! frame_limit = { fixed = 30.0 }   # or "auto" / "none"
//! fallback_refresh_rate = 60.0
//! drain_limit = 0                   # 0 = drain everything each tick
//! ```

use crate::error::{Error, Result};
use crate::event_loop::FrameLimit;
use crate::sources::display::DEFAULT_REFRESH_RATE;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Refresh rate used by [`FrameLimit::Auto`] when no display is attached.
    pub fallback_refresh_rate: f64,
    /// Maximum events dispatched per tick; `0` means no limit.
    pub drain_limit: usize,
    // Kept last: it may serialize as a TOML table.
    pub frame_limit: FrameLimit,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_limit: FrameLimit::Auto,
            fallback_refresh_rate: DEFAULT_REFRESH_RATE,
            drain_limit: 0,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_rate(self.fallback_refresh_rate) {
            return Err(Error::Config(format!(
                "fallback_refresh_rate must be a positive number, got {}",
                self.fallback_refresh_rate
            )));
        }
        if let FrameLimit::Fixed(hz) = self.frame_limit {
            if !is_rate(hz) {
                return Err(Error::Config(format!(
                    "fixed frame limit must be a positive number, got {hz}"
                )));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads a config file; `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let cfg = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_toml_str(&text)?
        };
        log::info!("Loaded loop config from {}", path.display());
        Ok(cfg)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }
}

fn is_rate(hz: f64) -> bool {
    hz.is_finite() && hz > 0.0
}
