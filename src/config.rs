use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::detection::Mode;
use crate::error::AppResult;
use crate::session::SessionConfig;

fn default_mode() -> String {
    "home".to_string()
}

fn default_home_model() -> String {
    "yolov8n.onnx".to_string()
}

fn default_fire_model() -> String {
    "fire.onnx".to_string()
}

fn default_violence_model() -> String {
    "violence.onnx".to_string()
}

fn default_alerts_dir() -> String {
    "alerts".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Capture device index; 0 is the default camera
    pub camera_index: i32,

    /// Operating mode: "home" or "public"
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Model reference for home mode
    #[serde(default = "default_home_model")]
    pub home_model: String,

    /// Model references for public mode
    #[serde(default = "default_fire_model")]
    pub fire_model: String,
    #[serde(default = "default_violence_model")]
    pub violence_model: String,

    /// Seconds of rolling history kept for alert clips
    pub buffer_seconds: f64,

    /// Assumed capture frame rate (also clip encode rate)
    pub fps: f64,

    /// Consecutive detection frames required to trigger an alert
    pub trigger_frames: u32,

    /// Minimum milliseconds between alerts; 0 disables the cooldown and
    /// re-triggers on every full detection window
    #[serde(default)]
    pub min_alert_interval_ms: u64,

    /// Directory alert clips and snapshots are written under
    #[serde(default = "default_alerts_dir")]
    pub alerts_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            mode: default_mode(),
            home_model: default_home_model(),
            fire_model: default_fire_model(),
            violence_model: default_violence_model(),
            buffer_seconds: 5.0,
            fps: 15.0,
            trigger_frames: 3,
            min_alert_interval_ms: 0,
            alerts_dir: default_alerts_dir(),
        }
    }
}

impl Config {
    /// Load configuration from the app's config directory, creating the
    /// default file on first run.
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            tracing::info!(path = %config_path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            tracing::info!(
                path = %config_path.display(),
                "created default configuration; edit this file to customize settings"
            );
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, json)
            .with_context(|| format!("writing {}", config_path.display()))?;
        Ok(())
    }

    /// Config file path (in the app's base directory)
    fn config_path() -> AppResult<PathBuf> {
        let exe_path = env::current_exe().context("determining executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("determining executable directory")?;
        Ok(exe_dir.join("config").join("config.json"))
    }

    /// The configured operating mode with its model references.
    pub fn operating_mode(&self) -> Mode {
        match self.mode.to_lowercase().as_str() {
            "public" => Mode::public(self.fire_model.clone(), self.violence_model.clone()),
            _ => Mode::home(self.home_model.clone()),
        }
    }

    /// Engine configuration derived from this file.
    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(self.operating_mode());
        session.fps = self.fps;
        session.buffer_seconds = self.buffer_seconds;
        session.trigger_frames = self.trigger_frames;
        session.min_alert_interval = Duration::from_millis(self.min_alert_interval_ms);
        session.alerts_dir = PathBuf::from(&self.alerts_dir);
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ModeKind;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.mode, "home");
        assert_eq!(config.buffer_seconds, 5.0);
        assert_eq!(config.fps, 15.0);
        assert_eq!(config.trigger_frames, 3);
        assert_eq!(config.min_alert_interval_ms, 0);
        assert_eq!(config.alerts_dir, "alerts");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.mode, deserialized.mode);
        assert_eq!(config.trigger_frames, deserialized.trigger_frames);
        assert_eq!(config.fps, deserialized.fps);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let json = r#"{
            "camera_index": 1,
            "buffer_seconds": 3.0,
            "fps": 10.0,
            "trigger_frames": 5
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.camera_index, 1);
        assert_eq!(config.mode, "home");
        assert_eq!(config.min_alert_interval_ms, 0);
        assert_eq!(config.alerts_dir, "alerts");
    }

    #[test]
    fn test_operating_mode_selection() {
        let mut config = Config::default();
        assert_eq!(config.operating_mode().kind(), ModeKind::Home);

        config.mode = "Public".to_string();
        assert_eq!(config.operating_mode().kind(), ModeKind::Public);
    }

    #[test]
    fn test_session_config_derivation() {
        let mut config = Config::default();
        config.trigger_frames = 4;
        config.min_alert_interval_ms = 2500;

        let session = config.session_config();
        assert_eq!(session.trigger_frames, 4);
        assert_eq!(session.min_alert_interval, Duration::from_millis(2500));
        assert_eq!(session.alerts_dir, PathBuf::from("alerts"));
    }
}
