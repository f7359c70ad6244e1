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

//! Release policy for sample buffers dropped from the pool.

use super::store::SampleData;

/// Receives sample buffers when they are unregistered from a [`super::SampleStore`].
///
/// The store never frees audio data on its own. Unregistering can happen from
/// inside the mixing callback, so hosts that must not deallocate on the audio
/// thread can hand the buffer off to another thread here.
pub trait SampleAllocator: Send + Sync {
    /// Releases a buffer the store no longer references.
    fn release(&self, data: SampleData);
}

/// Drops released buffers immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl SampleAllocator for SystemAllocator {
    fn release(&self, data: SampleData) {
        drop(data);
    }
}
