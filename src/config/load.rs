use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file and then lets environment
/// variables (prefix `STILLPOINT__`) override it, falling back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("STILLPOINT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.audio.tone_gain > 0.0 && self.audio.tone_gain <= 1.0) {
            return Err("audio.tone_gain must be in (0, 1]".to_string());
        }
        if !(self.audio.tone_frequency_hz.is_finite() && self.audio.tone_frequency_hz > 0.0) {
            return Err("audio.tone_frequency_hz must be > 0".to_string());
        }
        if self.audio.load_timeout_ms == 0 {
            return Err("audio.load_timeout_ms must be >= 1".to_string());
        }
        if self.progress.tick_ms == 0 {
            return Err("progress.tick_ms must be >= 1".to_string());
        }
        if let Some(t) = self.catalog.tracks.iter().find(|t| t.title.trim().is_empty()) {
            return Err(format!("catalog track with url {:?} has no title", t.url));
        }
        Ok(())
    }
}

/// Resolve the config path from `STILLPOINT_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("STILLPOINT_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/stillpoint/config.toml`
/// or `~/.config/stillpoint/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("stillpoint").join("config.toml"))
}
