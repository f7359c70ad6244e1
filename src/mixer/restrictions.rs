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
use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Limits a sample loader has to respect when preparing buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RestrictionFlags: u32 {
        /// Output runs at one fixed rate; pitch is done by resampling.
        const FIXED_OUTPUT_RATE = 0x01;
        /// Output is always interleaved stereo.
        const STEREO_OUTPUT = 0x02;
        /// ADPCM samples are accepted but mix as silence.
        const NO_ADPCM = 0x04;
        /// Custom-format samples are accepted but mix as silence.
        const NO_CUSTOM_FORMAT = 0x08;
        /// Samples must be single channel.
        const MONO_SAMPLES_ONLY = 0x10;
    }
}

/// Fixed engine limits reported by [`super::VoiceMixer::restrictions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restrictions {
    pub flags: RestrictionFlags,
    pub max_voices: usize,
    pub max_samples: usize,
    pub sample_rate: u32,
}

impl fmt::Display for Restrictions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sample rate: {} Hz", self.sample_rate)?;
        writeln!(f, "max voices:  {}", self.max_voices)?;
        writeln!(f, "max samples: {}", self.max_samples)?;
        write!(f, "flags:       ")?;
        let names: Vec<&str> = self.flags.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}
