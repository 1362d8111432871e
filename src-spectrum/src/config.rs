// ============================================================================
// Pipeline Configuration
// ============================================================================

use crate::error::ConfigError;
use crate::plugins::{DEFAULT_MAX_FRAMES, PipelineType, SHOW_KEY, Spectrum, StageConfig};
use crate::settings::MemorySettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sample rate of the audio graph in Hz
    pub sample_rate: u32,

    /// Largest chunk handed to the pipeline, in frames
    pub max_frames: usize,

    /// Maximum number of pending idle tasks
    pub idle_queue_capacity: usize,

    /// Number of spectrum snapshots that can be in flight
    pub snapshot_pool_size: usize,

    /// Minimum time between two level notifications
    pub level_interval_ms: u32,

    /// Initial value of the spectrum `show` switch
    pub show_spectrum: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            max_frames: DEFAULT_MAX_FRAMES,
            idle_queue_capacity: 64,
            snapshot_pool_size: 4,
            level_interval_ms: 100,
            show_spectrum: true,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        log::info!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if self.max_frames == 0 {
            return Err(ConfigError::Invalid("max_frames must be positive".into()));
        }
        if self.idle_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "idle_queue_capacity must be positive".into(),
            ));
        }
        if self.snapshot_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "snapshot_pool_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Number of samples between two level notifications
    pub fn level_interval_samples(&self) -> usize {
        ((self.sample_rate as u64 * self.level_interval_ms as u64) / 1000).max(1) as usize
    }

    /// Construction parameters for a stage of this pipeline
    pub fn stage_config(&self, tag: &str, schema: &str, pipe_type: PipelineType) -> StageConfig {
        StageConfig {
            level_interval_ms: self.level_interval_ms,
            ..StageConfig::new(tag, schema, pipe_type)
        }
    }

    /// Settings store for a spectrum stage, seeded from `show_spectrum`
    pub fn spectrum_settings(&self, schema_id: &str) -> MemorySettings {
        let settings = MemorySettings::new(schema_id, Spectrum::schema());
        if let Err(e) = settings.set_bool(SHOW_KEY, self.show_spectrum) {
            log::warn!("cannot seed '{}' in {}: {}", SHOW_KEY, schema_id, e);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsSource;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.snapshot_pool_size, 4);
        assert!(config.show_spectrum);
        assert!(config.validate().is_ok());

        // 100 ms at 48 kHz
        assert_eq!(config.level_interval_samples(), 4800);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            PipelineConfig::from_json_str(r#"{ "sample_rate": 44100, "show_spectrum": false }"#)
                .unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert!(!config.show_spectrum);
        assert_eq!(config.idle_queue_capacity, 64);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{ "sample_rate": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{ "snapshot_pool_size": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "level_interval_ms": 50 }}"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.level_interval_ms, 50);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            PipelineConfig::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_stage_and_settings_helpers() {
        let config = PipelineConfig {
            level_interval_ms: 20,
            show_spectrum: false,
            ..Default::default()
        };

        let stage = config.stage_config("spectrum#1", "spectrum", PipelineType::Input);
        assert_eq!(stage.level_interval_ms, 20);
        assert_eq!(stage.pipe_type, PipelineType::Input);

        let settings = config.spectrum_settings("spectrum");
        assert_eq!(settings.get_bool(SHOW_KEY), Some(false));
    }
}
