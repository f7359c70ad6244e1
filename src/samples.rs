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

//! Sample pool for the voice mixer.
//!
//! This module provides:
//! - Registration of decoded PCM buffers under small integer handles
//! - Loop metadata validation
//! - An injectable release policy for unregistered buffers
//! - WAV loading for the command line tool and tests

mod allocator;
mod error;
pub mod loader;
mod store;

pub use allocator::{SampleAllocator, SystemAllocator};
pub use error::SampleError;
pub use store::{
    LoopType, SampleData, SampleDescriptor, SampleEntry, SampleFormat, SampleHandle,
    SampleStore, DEFAULT_MAX_SAMPLES,
};
