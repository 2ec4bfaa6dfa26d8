//! # Engine Configuration
//!
//! TOML description of the scenes an orchestrator starts with and how long
//! to run it. Loaded once at startup.
//!
//! ```toml
//! [run]
//! frames = 3
//! dt = 1.0
//!
//! [[scenes]]
//! name = "TeamAlpha"
//! active = true
//! preallocate = 100
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML for [`EngineConfig`].
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parse but make no sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// How long to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of frames `Orchestrator::run` ticks.
    pub frames: u64,
    /// Seconds passed to every system per frame.
    pub dt: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { frames: 3, dt: 1.0 }
    }
}

/// One scene to create at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    /// Unique scene name.
    pub name: String,
    /// Whether the scene is ticked.
    #[serde(default)]
    pub active: bool,
    /// Entity ids reserved up front.
    #[serde(default = "default_preallocate")]
    pub preallocate: usize,
}

const fn default_preallocate() -> usize {
    100
}

impl SceneConfig {
    /// An active scene with the default reservation.
    #[must_use]
    pub fn active(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            preallocate: default_preallocate(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Run length.
    pub run: RunConfig,
    /// Scenes in creation order.
    pub scenes: Vec<SceneConfig>,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`], [`ConfigError::Parse`] or
    /// [`ConfigError::Invalid`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that scene names are non-empty and unique and that `dt` is a
    /// finite positive number.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.run.dt.is_finite() || self.run.dt <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "run.dt must be a finite positive number, got {}",
                self.run.dt
            )));
        }

        let mut seen = HashSet::new();
        for scene in &self.scenes {
            if scene.name.trim().is_empty() {
                return Err(ConfigError::Invalid("scene name must not be empty".into()));
            }
            if !seen.insert(scene.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "scene `{}` is declared twice",
                    scene.name
                )));
            }
        }
        Ok(())
    }

    /// Replaces the run length with command-line values, then revalidates.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the resulting `dt` is unusable.
    pub fn override_run(&mut self, frames: Option<u64>, dt: Option<f64>) -> ConfigResult<()> {
        if let Some(frames) = frames {
            self.run.frames = frames;
        }
        if let Some(dt) = dt {
            self.run.dt = dt;
        }
        self.validate()
    }

    /// Looks up a scene by name.
    #[must_use]
    pub fn scene(&self, name: &str) -> Option<&SceneConfig> {
        self.scenes.iter().find(|scene| scene.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.run.frames, 3);
        assert_eq!(config.run.dt, 1.0);
        assert!(config.scenes.is_empty());
    }

    #[test]
    fn test_full_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            [run]
            frames = 5
            dt = 0.5

            [[scenes]]
            name = "scene1"
            active = true

            [[scenes]]
            name = "scene2"
            preallocate = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.run.frames, 5);
        assert_eq!(config.run.dt, 0.5);
        assert_eq!(config.scenes.len(), 2);

        let first = config.scene("scene1").unwrap();
        assert!(first.active);
        assert_eq!(first.preallocate, 100);

        let second = config.scene("scene2").unwrap();
        assert!(!second.active);
        assert_eq!(second.preallocate, 8);
    }

    #[test]
    fn test_duplicate_scene_names_rejected() {
        let err = EngineConfig::from_toml_str(
            r#"
            [[scenes]]
            name = "twin"
            [[scenes]]
            name = "twin"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("twin")));
    }

    #[test]
    fn test_bad_dt_rejected() {
        let err = EngineConfig::from_toml_str("[run]\ndt = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_syntax_and_unknown_keys_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("[run\nframes = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[run]\nspeed = 2\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_override_run() {
        let mut config = EngineConfig::default();
        config.override_run(Some(7), None).unwrap();
        assert_eq!(config.run, RunConfig { frames: 7, dt: 1.0 });

        assert!(config.override_run(None, Some(-1.0)).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("not/here.toml"));
    }
}
