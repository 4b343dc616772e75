use std::path::Path;

use pwm_tone_common::{PinTopology, ToneConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid board config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bpm must be greater than zero")]
    ZeroBpm,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub topology: PinTopology,
    #[serde(default)]
    pub tone: ToneConfig,
}

/// 模拟板配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub lead: OutputConfig,
    pub bass: OutputConfig,
    pub bpm: u32,
    pub volume: f32,
    /// Silence cut from the end of each note.
    pub gap_ms: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            lead: OutputConfig {
                topology: PinTopology::Differential { plus: 0, minus: 1 },
                tone: ToneConfig::with_alarm(2),
            },
            bass: OutputConfig {
                topology: PinTopology::SingleEnded { pin: 4 },
                tone: ToneConfig::with_alarm(3),
            },
            bpm: 132,
            volume: 60.0,
            gap_ms: 15,
        }
    }
}

impl SimulatorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_json::from_str(json)?;
        if config.bpm == 0 {
            return Err(ConfigLoadError::ZeroBpm);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}
