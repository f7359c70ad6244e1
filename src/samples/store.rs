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

//! Fixed-capacity pool of registered sample buffers.

use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::allocator::SampleAllocator;
use super::error::SampleError;

/// Default number of slots in the sample pool.
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Sample format enumeration for registered sample data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 8-bit PCM
    Pcm8,
    /// Signed 16-bit PCM
    Pcm16,
    /// 4-bit ADPCM, not mixable in software
    Adpcm,
    /// Opaque encoder-specific data, not mixable in software
    Custom,
}

impl SampleFormat {
    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Pcm8 => "pcm8",
            SampleFormat::Pcm16 => "pcm16",
            SampleFormat::Adpcm => "adpcm",
            SampleFormat::Custom => "custom",
        }
    }

    /// Returns true if the software mixer can render this format.
    pub fn is_mixable(self) -> bool {
        matches!(self, SampleFormat::Pcm8 | SampleFormat::Pcm16)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How playback continues once it reaches the end of the loop region.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopType {
    /// Play once and stop.
    #[default]
    Disabled,
    /// Jump from the loop end back to the loop begin.
    Forward,
    /// Reverse direction at each loop boundary.
    PingPong,
}

impl FromStr for LoopType {
    fn from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        match s {
            "none" | "disabled" | "Disabled" => Ok(LoopType::Disabled),
            "forward" | "Forward" => Ok(LoopType::Forward),
            "pingpong" | "ping-pong" | "PingPong" => Ok(LoopType::PingPong),
            _ => Err(format!("Unsupported loop type: {}", s).into()),
        }
    }

    type Err = Box<dyn Error>;
}

/// Raw mono sample data. The pool shares the buffer with its owner and never copies it.
#[derive(Clone, Debug)]
pub enum SampleData {
    Pcm8(Arc<[i8]>),
    Pcm16(Arc<[i16]>),
    /// Packed 4-bit ADPCM, two frames per byte.
    Adpcm(Arc<[u8]>),
    /// One frame per byte.
    Custom(Arc<[u8]>),
}

impl SampleData {
    /// Returns the format of this data.
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleData::Pcm8(_) => SampleFormat::Pcm8,
            SampleData::Pcm16(_) => SampleFormat::Pcm16,
            SampleData::Adpcm(_) => SampleFormat::Adpcm,
            SampleData::Custom(_) => SampleFormat::Custom,
        }
    }

    /// Returns the length in sample frames.
    pub fn frames(&self) -> usize {
        match self {
            SampleData::Pcm8(data) => data.len(),
            SampleData::Pcm16(data) => data.len(),
            SampleData::Adpcm(data) => data.len() * 2,
            SampleData::Custom(data) => data.len(),
        }
    }

    /// Returns true if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Returns true if both values point at the same underlying buffer.
    pub fn same_buffer(&self, other: &SampleData) -> bool {
        self.buffer_ptr() == other.buffer_ptr()
    }

    fn buffer_ptr(&self) -> *const u8 {
        match self {
            SampleData::Pcm8(data) => data.as_ptr() as *const u8,
            SampleData::Pcm16(data) => data.as_ptr() as *const u8,
            SampleData::Adpcm(data) | SampleData::Custom(data) => data.as_ptr(),
        }
    }
}

/// Describes a sample to register: the data plus its loop settings.
#[derive(Clone, Debug)]
pub struct SampleDescriptor {
    data: SampleData,
    loop_type: LoopType,
    loop_begin: usize,
    loop_end: usize,
}

impl SampleDescriptor {
    /// Creates a non-looping descriptor.
    pub fn new(data: SampleData) -> Self {
        Self {
            data,
            loop_type: LoopType::Disabled,
            loop_begin: 0,
            loop_end: 0,
        }
    }

    /// Sets the loop mode and the loop region in frames (`end` is exclusive).
    pub fn with_loop(mut self, loop_type: LoopType, begin: usize, end: usize) -> Self {
        self.loop_type = loop_type;
        self.loop_begin = begin;
        self.loop_end = end;
        self
    }

    /// Gets the sample data.
    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Gets the loop mode.
    pub fn loop_type(&self) -> LoopType {
        self.loop_type
    }
}

/// An immutable registered sample.
#[derive(Clone, Debug)]
pub struct SampleEntry {
    data: SampleData,
    length: usize,
    loop_type: LoopType,
    loop_begin: usize,
    loop_end: usize,
}

impl SampleEntry {
    fn from_descriptor(descriptor: SampleDescriptor) -> Result<Self, SampleError> {
        let length = descriptor.data.frames();
        let SampleDescriptor {
            data,
            mut loop_type,
            mut loop_begin,
            mut loop_end,
        } = descriptor;

        if loop_type != LoopType::Disabled {
            if loop_begin > loop_end || loop_end > length {
                return Err(SampleError::InvalidLoop {
                    begin: loop_begin,
                    end: loop_end,
                    length,
                });
            }
            // An empty loop region can never be entered.
            if loop_begin == loop_end {
                loop_type = LoopType::Disabled;
            }
        }
        if loop_type == LoopType::Disabled {
            loop_begin = 0;
            loop_end = 0;
        }

        Ok(Self {
            data,
            length,
            loop_type,
            loop_begin,
            loop_end,
        })
    }

    /// Gets the sample data.
    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Gets the sample format.
    pub fn format(&self) -> SampleFormat {
        self.data.format()
    }

    /// Gets the length in frames.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Gets the effective loop mode.
    pub fn loop_type(&self) -> LoopType {
        self.loop_type
    }

    /// Gets the first frame of the loop region.
    pub fn loop_begin(&self) -> usize {
        self.loop_begin
    }

    /// Gets the frame one past the end of the loop region.
    pub fn loop_end(&self) -> usize {
        self.loop_end
    }

    /// Returns true if playback wraps or reflects at the loop bounds.
    pub fn is_looped(&self) -> bool {
        self.loop_type != LoopType::Disabled
    }
}

/// Identifies a registered sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleHandle(usize);

impl SampleHandle {
    /// Creates a handle from a raw slot index. The index is checked on use.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Returns the slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SampleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The sample pool. Slots are reused in place; a free slot holds `None`.
pub struct SampleStore {
    slots: Vec<Option<SampleEntry>>,
    allocator: Arc<dyn SampleAllocator>,
}

impl SampleStore {
    /// Creates a pool with the given number of slots.
    pub fn new(capacity: usize, allocator: Arc<dyn SampleAllocator>) -> Self {
        Self {
            slots: vec![None; capacity],
            allocator,
        }
    }

    /// Registers a sample in the first free slot.
    pub fn register(&mut self, descriptor: SampleDescriptor) -> Result<SampleHandle, SampleError> {
        if descriptor.data.is_empty() {
            warn!("Refusing to register empty sample data");
            return Err(SampleError::EmptyData);
        }

        if let Some(existing) = self.find_buffer(&descriptor.data) {
            warn!(sample = %existing, "Sample buffer is already registered");
            return Err(SampleError::AlreadyRegistered(existing));
        }

        let Some(index) = self.slots.iter().position(Option::is_none) else {
            warn!(capacity = self.slots.len(), "Sample pool is full");
            return Err(SampleError::PoolExhausted(self.slots.len()));
        };

        let entry = SampleEntry::from_descriptor(descriptor).inspect_err(|e| {
            warn!(error = %e, "Rejecting sample with invalid loop");
        })?;

        debug!(
            sample = index,
            format = %entry.format(),
            frames = entry.length,
            loop_type = ?entry.loop_type,
            "Registered sample"
        );
        self.slots[index] = Some(entry);
        Ok(SampleHandle(index))
    }

    /// Removes a sample and hands its buffer to the allocator.
    pub fn unregister(&mut self, handle: SampleHandle) -> Result<(), SampleError> {
        let Some(slot) = self.slots.get_mut(handle.0) else {
            warn!(
                sample = handle.0,
                capacity = self.slots.len(),
                "Sample handle out of range"
            );
            return Err(SampleError::InvalidHandle(handle.0));
        };

        match slot.take() {
            Some(entry) => {
                debug!(sample = handle.0, "Unregistered sample");
                self.allocator.release(entry.data);
                Ok(())
            }
            None => {
                warn!(sample = handle.0, "Sample handle is not registered");
                Err(SampleError::NotRegistered(handle.0))
            }
        }
    }

    /// Looks up a registered sample.
    pub fn get(&self, handle: SampleHandle) -> Option<&SampleEntry> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    /// Validates a handle, distinguishing out-of-range from unregistered.
    pub fn lookup(&self, handle: SampleHandle) -> Result<&SampleEntry, SampleError> {
        match self.slots.get(handle.0) {
            None => Err(SampleError::InvalidHandle(handle.0)),
            Some(None) => Err(SampleError::NotRegistered(handle.0)),
            Some(Some(entry)) => Ok(entry),
        }
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of registered samples.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns true if no samples are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find_buffer(&self, data: &SampleData) -> Option<SampleHandle> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|e| e.data.same_buffer(data)))
            .map(SampleHandle)
    }
}

impl fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleStore")
            .field("registered", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::SystemAllocator;
    use crate::testutil::{pcm16_sine, CountingAllocator};

    fn store(capacity: usize) -> SampleStore {
        SampleStore::new(capacity, Arc::new(SystemAllocator))
    }

    #[test]
    fn test_register_uses_first_free_slot() {
        let mut store = store(4);
        let a = store
            .register(SampleDescriptor::new(pcm16_sine(100, 20)))
            .unwrap();
        let b = store
            .register(SampleDescriptor::new(pcm16_sine(100, 20)))
            .unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);

        store.unregister(a).unwrap();
        let c = store
            .register(SampleDescriptor::new(pcm16_sine(50, 10)))
            .unwrap();
        assert_eq!(c.index(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_register_rejects_empty_data() {
        let mut store = store(4);
        let empty = SampleData::Pcm8(Arc::from(Vec::<i8>::new()));
        assert_eq!(
            store.register(SampleDescriptor::new(empty)).unwrap_err(),
            SampleError::EmptyData
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_buffer() {
        let mut store = store(4);
        let data = pcm16_sine(64, 16);
        let handle = store
            .register(SampleDescriptor::new(data.clone()))
            .unwrap();
        assert_eq!(
            store.register(SampleDescriptor::new(data)).unwrap_err(),
            SampleError::AlreadyRegistered(handle)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_pool_exhausted() {
        let mut store = store(2);
        for _ in 0..2 {
            store
                .register(SampleDescriptor::new(pcm16_sine(10, 5)))
                .unwrap();
        }
        assert_eq!(
            store
                .register(SampleDescriptor::new(pcm16_sine(10, 5)))
                .unwrap_err(),
            SampleError::PoolExhausted(2)
        );
    }

    #[test]
    fn test_descriptor_defaults_to_unlooped() {
        let descriptor = SampleDescriptor::new(pcm16_sine(100, 10));
        assert_eq!(descriptor.loop_type(), LoopType::Disabled);
        assert_eq!(descriptor.data().frames(), 100);

        let descriptor = descriptor.with_loop(LoopType::PingPong, 10, 90);
        assert_eq!(descriptor.loop_type(), LoopType::PingPong);
        assert_eq!(descriptor.data().format(), SampleFormat::Pcm16);
    }

    #[test]
    fn test_register_validates_loop() {
        let mut store = store(4);
        let result = store.register(
            SampleDescriptor::new(pcm16_sine(100, 10)).with_loop(LoopType::Forward, 50, 101),
        );
        assert_eq!(
            result.unwrap_err(),
            SampleError::InvalidLoop {
                begin: 50,
                end: 101,
                length: 100
            }
        );

        let result = store.register(
            SampleDescriptor::new(pcm16_sine(100, 10)).with_loop(LoopType::PingPong, 60, 40),
        );
        assert!(matches!(result, Err(SampleError::InvalidLoop { .. })));

        // Loop bounds are ignored when looping is disabled.
        let handle = store
            .register(
                SampleDescriptor::new(pcm16_sine(100, 10)).with_loop(LoopType::Disabled, 60, 400),
            )
            .unwrap();
        assert_eq!(store.get(handle).unwrap().loop_end(), 0);
    }

    #[test]
    fn test_empty_loop_region_disables_looping() {
        let mut store = store(4);
        let handle = store
            .register(
                SampleDescriptor::new(pcm16_sine(100, 10)).with_loop(LoopType::Forward, 30, 30),
            )
            .unwrap();
        let entry = store.get(handle).unwrap();
        assert_eq!(entry.loop_type(), LoopType::Disabled);
        assert!(!entry.is_looped());
    }

    #[test]
    fn test_unregister_releases_through_allocator() {
        let allocator = Arc::new(CountingAllocator::default());
        let mut store = SampleStore::new(4, allocator.clone());
        let handle = store
            .register(SampleDescriptor::new(pcm16_sine(10, 5)))
            .unwrap();

        store.unregister(handle).unwrap();
        assert_eq!(allocator.released(), 1);
        assert!(store.get(handle).is_none());

        assert_eq!(
            store.unregister(handle).unwrap_err(),
            SampleError::NotRegistered(0)
        );
        assert_eq!(
            store.unregister(SampleHandle::from_index(99)).unwrap_err(),
            SampleError::InvalidHandle(99)
        );
        assert_eq!(allocator.released(), 1);
    }

    #[test]
    fn test_lookup_errors() {
        let mut store = store(2);
        let handle = store
            .register(SampleDescriptor::new(pcm16_sine(10, 5)))
            .unwrap();
        assert!(store.lookup(handle).is_ok());
        assert_eq!(
            store.lookup(SampleHandle::from_index(1)).unwrap_err(),
            SampleError::NotRegistered(1)
        );
        assert_eq!(
            store.lookup(SampleHandle::from_index(5)).unwrap_err(),
            SampleError::InvalidHandle(5)
        );
    }

    #[test]
    fn test_data_frames_per_format() {
        let adpcm = SampleData::Adpcm(Arc::from(vec![0u8; 8]));
        assert_eq!(adpcm.frames(), 16);
        assert_eq!(adpcm.format(), SampleFormat::Adpcm);
        assert!(!adpcm.format().is_mixable());
        assert!(SampleFormat::Pcm8.is_mixable());
        assert_eq!(SampleFormat::Pcm16.to_string(), "pcm16");
    }

    #[test]
    fn test_loop_type_from_str() {
        assert_eq!(LoopType::from_str("none").unwrap(), LoopType::Disabled);
        assert_eq!(LoopType::from_str("forward").unwrap(), LoopType::Forward);
        assert_eq!(LoopType::from_str("ping-pong").unwrap(), LoopType::PingPong);
        assert!(LoopType::from_str("backward").is_err());
    }
}
