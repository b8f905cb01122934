use crate::error::{AnalysisError, AnalysisResult};
use crate::mini_court::court_length_px;
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        let invalid = |msg: String| Err(AnalysisError::Config(msg));

        if !(self.video.fps > 0.0) {
            return invalid(format!("video.fps must be positive, got {}", self.video.fps));
        }
        if self.shots.smoothing_window == 0 {
            return invalid("shots.smoothing_window must be at least 1".to_string());
        }

        let court = &self.mini_court;
        if court.width == 0 || court.height == 0 {
            return invalid(format!(
                "mini_court size must be non-zero, got {}x{}",
                court.width, court.height
            ));
        }
        if court.padding * 2 >= court.width.min(court.height) {
            return invalid(format!(
                "mini_court.padding {} leaves no room for a {}x{} court",
                court.padding, court.width, court.height
            ));
        }
        let court_width = (court.width - court.padding * 2) as f64;
        let court_length = court_length_px(court_width);
        let room = (court.height - court.padding * 2) as f64;
        if court_length > room {
            return invalid(format!(
                "mini_court.height {} is too short: a {:.0}px wide court is {:.0}px long, only {:.0}px fit",
                court.height, court_width, court_length, room
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CacheMode, TurningPoints};

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "video:\n  input: clips/final.mp4\ncache:\n  mode: refresh\nshots:\n  turning_points: minima\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.video.input, "clips/final.mp4");
        assert_eq!(config.video.fps, 24.0);
        assert_eq!(config.cache.mode, CacheMode::Refresh);
        assert_eq!(config.shots.turning_points, TurningPoints::Minima);
        assert_eq!(config.shots.smoothing_window, 5);
        assert_eq!(config.mini_court.width, 250);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.video.fps = 0.0;
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = Config::default();
        config.shots.smoothing_window = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mini_court.padding = 125;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_court_longer_than_layout() {
        let mut config = Config::default();
        config.mini_court.width = 300;
        config.mini_court.height = 500;
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        config.mini_court.height = 620;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/tennis.yaml").is_err());
    }
}
