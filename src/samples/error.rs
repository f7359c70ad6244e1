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

use super::store::SampleHandle;

/// Error types for sample pool operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("Sample data is empty")]
    EmptyData,

    #[error("Sample buffer is already registered as {0}")]
    AlreadyRegistered(SampleHandle),

    #[error("Sample pool is full ({0} slots)")]
    PoolExhausted(usize),

    #[error("Sample handle {0} is out of range")]
    InvalidHandle(usize),

    #[error("Sample handle {0} is not registered")]
    NotRegistered(usize),

    #[error("Invalid loop bounds {begin}..{end} for a sample of {length} frames")]
    InvalidLoop {
        begin: usize,
        end: usize,
        length: usize,
    },
}
