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

//! Software PCM voice mixer.
//!
//! This module provides:
//! - A fixed table of voices playing registered samples with fixed-point
//!   resampling, linear interpolation and forward or ping-pong loops
//! - Per-call volume ramps and a declicker for stopped voices
//! - A sequencer hook ticked on a fixed output-frame interval
//! - A bounded command queue for controlling voices from other threads
//!
//! Output is interleaved stereo, clamped to 16 bits.

mod bank;
mod command;
mod declicker;
mod engine;
mod error;
mod pan;
mod restrictions;
mod voice;


pub use bank::VoiceBank;
pub use command::{CommandSender, VoiceCommand};
pub use declicker::Declicker;
pub use engine::{OutputSample, Sequencer, VoiceMixer};
pub use error::{CommandError, VoiceError};
pub use pan::{PanningLaw, PAN_CENTER};
pub use restrictions::{RestrictionFlags, Restrictions};
pub use voice::Voice;

/// Fractional bits of voice positions and increments.
pub const FRAC_BITS: u32 = 16;

/// Fractional bits of the volume ramp.
pub const VOL_FRAC_BITS: u32 = 16;

/// Right shift from the accumulator to 16-bit output. Eight bits undo the
/// 0-255 gain and one bit is headroom for summing voices.
pub const OUTPUT_SHIFT: u32 = 9;

/// Frames in the declicker ring.
pub const DECLICKER_BUFFER_SIZE: usize = 512;

/// Length in frames of a declick tail.
pub const DECLICKER_FADE_SIZE: usize = 64;

/// Largest chunk mixed at once.
pub const MAX_CHUNK_FRAMES: usize = 1024;

/// Upper bound for the number of voices.
pub const MAX_VOICES_LIMIT: usize = 256;

/// Default number of voices.
pub const DEFAULT_MAX_VOICES: usize = 32;
