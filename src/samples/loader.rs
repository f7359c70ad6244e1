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

//! Loads WAV files into mono PCM sample data for registration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat as WavSampleFormat, WavReader};
use tracing::info;

use super::store::SampleData;

/// Error types for WAV loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported WAV layout: {0}")]
    UnsupportedFormat(String),
}

/// A decoded sample ready to be wrapped in a descriptor.
#[derive(Clone, Debug)]
pub struct LoadedSample {
    /// The first channel of the file as PCM data.
    data: SampleData,
    /// The file's native sample rate, i.e. the unity-pitch playback frequency.
    sample_rate: u32,
}

impl LoadedSample {
    /// Gets the sample data.
    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Takes the sample data.
    pub fn into_data(self) -> SampleData {
        self.data
    }

    /// Gets the native sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Loads a WAV file. Multi-channel files keep their first channel only.
/// 8-bit files become PCM8; everything wider is reduced to PCM16.
pub fn load_wav(path: &Path) -> Result<LoadedSample, LoadError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(LoadError::UnsupportedFormat("zero channels".to_string()));
    }

    let data = match (spec.sample_format, spec.bits_per_sample) {
        (WavSampleFormat::Int, 8) => {
            let samples = reader
                .samples::<i8>()
                .step_by(channels)
                .collect::<Result<Vec<i8>, _>>()?;
            SampleData::Pcm8(Arc::from(samples))
        }
        (WavSampleFormat::Int, 9..=16) => {
            let samples = reader
                .samples::<i16>()
                .step_by(channels)
                .collect::<Result<Vec<i16>, _>>()?;
            SampleData::Pcm16(Arc::from(samples))
        }
        (WavSampleFormat::Int, bits @ 17..=32) => {
            let shift = bits - 16;
            let samples = reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|s| (s >> shift) as i16))
                .collect::<Result<Vec<i16>, _>>()?;
            SampleData::Pcm16(Arc::from(samples))
        }
        (WavSampleFormat::Float, 32) => {
            let samples = reader
                .samples::<f32>()
                .step_by(channels)
                .map(|s| s.map(|s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16))
                .collect::<Result<Vec<i16>, _>>()?;
            SampleData::Pcm16(Arc::from(samples))
        }
        (format, bits) => {
            return Err(LoadError::UnsupportedFormat(format!(
                "{:?} with {} bits per sample",
                format, bits
            )))
        }
    };

    let duration = Duration::from_secs_f64(data.frames() as f64 / spec.sample_rate.max(1) as f64);
    info!(
        path = ?path,
        channels,
        format = %data.format(),
        sample_rate = spec.sample_rate,
        duration_ms = duration.as_millis(),
        "Sample loaded"
    );

    Ok(LoadedSample {
        data,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use hound::{WavSpec, WavWriter};

    use super::*;
    use crate::samples::SampleFormat;

    fn write_wav(path: &Path, bits: u16, channels: u16, frames: &[i32]) {
        let spec = WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: bits,
            sample_format: WavSampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &value in frames {
            for channel in 0..channels {
                let sample = if channel == 0 { value } else { -value };
                match bits {
                    8 => writer.write_sample(sample as i8).unwrap(),
                    16 => writer.write_sample(sample as i16).unwrap(),
                    _ => writer.write_sample(sample).unwrap(),
                }
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_pcm16_stereo_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 16, 2, &[100, 200, -300]);

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.sample_rate(), 22050);
        match loaded.data() {
            SampleData::Pcm16(data) => assert_eq!(&data[..], &[100, 200, -300]),
            other => panic!("unexpected format {:?}", other.format()),
        }
    }

    #[test]
    fn test_load_pcm8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono8.wav");
        write_wav(&path, 8, 1, &[10, -20, 127]);

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.data().format(), SampleFormat::Pcm8);
        assert_eq!(loaded.data().frames(), 3);
    }

    #[test]
    fn test_load_pcm24_reduces_to_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono24.wav");
        write_wav(&path, 24, 1, &[0x10000, -0x20000]);

        let loaded = load_wav(&path).unwrap();
        match loaded.into_data() {
            SampleData::Pcm16(data) => assert_eq!(&data[..], &[0x100, -0x200]),
            other => panic!("unexpected format {:?}", other.format()),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_wav(&dir.path().join("missing.wav")),
            Err(LoadError::Wav(_))
        ));
    }
}
