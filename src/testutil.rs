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
use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::samples::{SampleAllocator, SampleData};

/// A 16-bit sine at 3/4 full scale with the given period in frames.
pub fn pcm16_sine(frames: usize, period: usize) -> SampleData {
    let samples: Vec<i16> = (0..frames)
        .map(|i| ((2.0 * PI * i as f32 / period as f32).sin() * 24576.0) as i16)
        .collect();
    SampleData::Pcm16(Arc::from(samples))
}

/// A 16-bit buffer holding one value.
pub fn pcm16_constant(frames: usize, value: i16) -> SampleData {
    SampleData::Pcm16(Arc::from(vec![value; frames]))
}

/// A 16-bit buffer where frame `i` holds `i * step`.
pub fn pcm16_ramp(frames: usize, step: i16) -> SampleData {
    let samples: Vec<i16> = (0..frames).map(|i| i as i16 * step).collect();
    SampleData::Pcm16(Arc::from(samples))
}

/// An 8-bit buffer holding one value.
pub fn pcm8_constant(frames: usize, value: i8) -> SampleData {
    SampleData::Pcm8(Arc::from(vec![value; frames]))
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Counts released buffers.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    released: AtomicUsize,
}

impl CountingAllocator {
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl SampleAllocator for CountingAllocator {
    fn release(&self, data: SampleData) {
        drop(data);
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
