// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::Path;
use std::time::Duration;

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::mixer::{PanningLaw, DEFAULT_MAX_VOICES, MAX_VOICES_LIMIT};
use crate::samples::DEFAULT_MAX_SAMPLES;

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CALLBACK_INTERVAL: Duration = Duration::from_millis(20);
const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 256;
const MAX_SAMPLES_LIMIT: usize = 4096;

/// A YAML representation of the mixer configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct MixerConfig {
    /// Fixed output rate in Hz (default: 44100)
    sample_rate: Option<u32>,

    /// Number of voices (default: 32)
    max_voices: Option<usize>,

    /// Number of sample slots (default: 256)
    max_samples: Option<usize>,

    /// How volume and pan map to channel gains (default: centered)
    panning_law: Option<PanningLaw>,

    /// Time between sequencer ticks, e.g. "20ms".
    callback_interval: Option<String>,

    /// Capacity of the cross-thread command queue (default: 256)
    command_queue_capacity: Option<usize>,
}

impl MixerConfig {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<MixerConfig, ConfigError> {
        let config: MixerConfig = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> Result<MixerConfig, ConfigError> {
        let config: MixerConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = Some(max_voices);
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    pub fn with_panning_law(mut self, panning_law: PanningLaw) -> Self {
        self.panning_law = Some(panning_law);
        self
    }

    pub fn with_callback_interval(mut self, callback_interval: &str) -> Self {
        self.callback_interval = Some(callback_interval.to_string());
        self
    }

    pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = Some(capacity);
        self
    }

    /// Returns the output sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the number of voices (default: 32)
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES)
    }

    /// Returns the number of sample slots (default: 256)
    pub fn max_samples(&self) -> usize {
        self.max_samples.unwrap_or(DEFAULT_MAX_SAMPLES)
    }

    pub fn panning_law(&self) -> PanningLaw {
        self.panning_law.unwrap_or_default()
    }

    /// Returns the time between sequencer ticks (default: 20ms)
    pub fn callback_interval(&self) -> Result<Duration, ConfigError> {
        match &self.callback_interval {
            Some(interval) => Ok(DurationString::from_string(interval.clone())
                .map_err(|e| ConfigError::Duration(format!("{}: {}", interval, e)))?
                .into()),
            None => Ok(DEFAULT_CALLBACK_INTERVAL),
        }
    }

    /// Returns the command queue capacity (default: 256)
    pub fn command_queue_capacity(&self) -> usize {
        self.command_queue_capacity
            .unwrap_or(DEFAULT_COMMAND_QUEUE_CAPACITY)
    }

    /// Checks every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate() == 0 {
            return Err(ConfigError::Invalid(
                "sample_rate must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_VOICES_LIMIT).contains(&self.max_voices()) {
            return Err(ConfigError::Invalid(format!(
                "max_voices must be between 1 and {}, got {}",
                MAX_VOICES_LIMIT,
                self.max_voices()
            )));
        }
        if !(1..=MAX_SAMPLES_LIMIT).contains(&self.max_samples()) {
            return Err(ConfigError::Invalid(format!(
                "max_samples must be between 1 and {}, got {}",
                MAX_SAMPLES_LIMIT,
                self.max_samples()
            )));
        }
        if self.command_queue_capacity() == 0 {
            return Err(ConfigError::Invalid(
                "command_queue_capacity must be greater than zero".to_string(),
            ));
        }
        self.callback_interval()?;
        Ok(())
    }
}
