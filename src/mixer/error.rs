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

use crate::samples::SampleError;

/// Error types for voice control operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    #[error("Voice {voice} is out of range (max voices: {max_voices})")]
    InvalidVoice { voice: usize, max_voices: usize },

    #[error("Sample error: {0}")]
    Sample(#[from] SampleError),
}

/// Error types for the cross-thread command queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Voice command queue is full")]
    QueueFull,

    #[error("Voice mixer has been dropped")]
    Disconnected,
}
