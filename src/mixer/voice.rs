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

//! Per-voice playback state and the resampling inner loop.
//!
//! Positions and increments are signed fixed-point frame indices with
//! [`FRAC_BITS`] fractional bits. Loop boundaries are resolved before any
//! frame is emitted, and the number of frames that can be rendered before the
//! next boundary is computed up front so the inner loop never checks bounds.

use super::pan::{PanningLaw, PAN_CENTER};
use super::{FRAC_BITS, VOL_FRAC_BITS};
use crate::samples::{LoopType, SampleData, SampleEntry, SampleHandle};

const FRAC_MASK: i64 = (1 << FRAC_BITS) - 1;

/// A playback slot. Voices live in a fixed table and are reused in place.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    /// The sample being played.
    sample: Option<SampleHandle>,
    /// Fixed-point frame cursor.
    position: i64,
    /// Fixed-point step per output frame. Negative means backwards.
    increment: i64,
    volume: u8,
    pan: u8,
    /// Gains reached at the end of the previous mix, where the next ramp starts.
    old_volume_left: i32,
    old_volume_right: i32,
    active: bool,
    /// Set until the first mix after a start, which must not ramp.
    start: bool,
    /// Set until the position first reaches the loop region. Below it the
    /// sample plays as if unlooped.
    lead_in: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            sample: None,
            position: 0,
            increment: 0,
            volume: u8::MAX,
            pan: PAN_CENTER,
            old_volume_left: 0,
            old_volume_right: 0,
            active: false,
            start: false,
            lead_in: false,
        }
    }
}

impl Voice {
    /// Gets the sample this voice plays or last played.
    pub fn sample(&self) -> Option<SampleHandle> {
        self.sample
    }

    /// Gets the fixed-point position.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Gets the integer frame the voice is on.
    pub fn frame(&self) -> i64 {
        self.position >> FRAC_BITS
    }

    /// Gets the fixed-point pitch step.
    pub fn increment(&self) -> i64 {
        self.increment
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn pan(&self) -> u8 {
        self.pan
    }

    /// Returns true if the voice contributes to the mix.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns true if the voice is moving backwards.
    pub fn is_reversed(&self) -> bool {
        self.increment < 0
    }

    pub(super) fn start(&mut self, sample: SampleHandle, frame_offset: usize) {
        self.sample = Some(sample);
        self.position = (frame_offset as i64) << FRAC_BITS;
        self.increment = 0;
        self.start = true;
        self.lead_in = true;
        self.active = true;
    }

    pub(super) fn deactivate(&mut self) {
        self.active = false;
    }

    pub(super) fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    pub(super) fn set_pan(&mut self, pan: u8) {
        self.pan = pan;
    }

    /// Sets the pitch step magnitude, keeping the current direction.
    pub(super) fn set_step(&mut self, step: i64) {
        self.increment = if self.increment < 0 { -step } else { step };
    }

    pub(super) fn set_reversed(&mut self, reversed: bool) {
        let step = self.increment.abs();
        self.increment = if reversed { -step } else { step };
    }

    /// Mixes this voice into an interleaved stereo accumulator, ramping from the
    /// previous gains to the current ones across the whole buffer.
    pub(super) fn mix(&mut self, entry: &SampleEntry, buffer: &mut [i32], law: PanningLaw) {
        let frames = buffer.len() / 2;
        let (target_left, target_right) = law.gains(self.volume, self.pan);
        if self.start {
            self.old_volume_left = target_left;
            self.old_volume_right = target_right;
            self.start = false;
        }

        if frames > 0 {
            let mut left = Ramp::new(self.old_volume_left, target_left, frames);
            let mut right = Ramp::new(self.old_volume_right, target_right, frames);
            let mut offset = 0;

            while self.wrap(entry) && offset < frames {
                let count = self.frames_until_boundary(entry).min(frames - offset);
                let out = &mut buffer[offset * 2..(offset + count) * 2];

                match entry.data() {
                    SampleData::Pcm8(data) => {
                        self.render(entry, out, &mut left, &mut right, |i| {
                            (data[i] as i32) << 8
                        })
                    }
                    SampleData::Pcm16(data) => {
                        self.render(entry, out, &mut left, &mut right, |i| data[i] as i32)
                    }
                    // Not decodable here: keep time moving but add nothing.
                    SampleData::Adpcm(_) | SampleData::Custom(_) => {
                        self.position += self.increment * count as i64;
                        left.skip(count);
                        right.skip(count);
                    }
                }
                offset += count;
            }
        }

        self.old_volume_left = target_left;
        self.old_volume_right = target_right;
    }

    /// Resolves any loop boundary the position has crossed. Returns false if
    /// the voice ran off the end of an unlooped sample and was deactivated.
    fn wrap(&mut self, entry: &SampleEntry) -> bool {
        if !self.active {
            return false;
        }

        if !entry.is_looped() {
            let length = (entry.length() as i64) << FRAC_BITS;
            if self.position < 0 || self.position >= length {
                self.active = false;
                return false;
            }
            return true;
        }

        let begin = (entry.loop_begin() as i64) << FRAC_BITS;
        let end = (entry.loop_end() as i64) << FRAC_BITS;
        if self.lead_in {
            if self.position >= begin {
                self.lead_in = false;
            } else if self.position < 0 {
                self.active = false;
                return false;
            } else {
                return true;
            }
        }

        let crossed_begin = self.increment < 0 && self.position < begin;
        let crossed_end = self.increment > 0 && self.position >= end;
        if !crossed_begin && !crossed_end {
            return true;
        }

        match entry.loop_type() {
            LoopType::PingPong => {
                // Reflect around the crossed bound, staying inside [begin, end).
                self.position = if crossed_begin {
                    (2 * begin - self.position).min(end - 1)
                } else {
                    (2 * end - 1 - self.position).max(begin)
                };
                self.increment = -self.increment;
            }
            _ => {
                self.position = begin + (self.position - begin).rem_euclid(end - begin);
            }
        }
        true
    }

    /// Returns how many frames can be emitted before the position reaches the
    /// next loop bound or the end of the sample. Always at least one.
    fn frames_until_boundary(&self, entry: &SampleEntry) -> usize {
        if self.increment > 0 {
            let end = if entry.is_looped() {
                entry.loop_end()
            } else {
                entry.length()
            };
            let distance = ((end as i64) << FRAC_BITS) - self.position;
            ((distance + self.increment - 1) / self.increment).max(1) as usize
        } else if self.increment < 0 {
            let begin = if entry.is_looped() && !self.lead_in {
                entry.loop_begin()
            } else {
                0
            };
            let distance = self.position - ((begin as i64) << FRAC_BITS);
            (distance / -self.increment) as usize + 1
        } else {
            usize::MAX
        }
    }

    /// Emits `out.len() / 2` frames with linear interpolation. The caller
    /// guarantees every visited position is inside the sample.
    fn render<F>(
        &mut self,
        entry: &SampleEntry,
        out: &mut [i32],
        left: &mut Ramp,
        right: &mut Ramp,
        fetch: F,
    ) where
        F: Fn(usize) -> i32,
    {
        for frame in out.chunks_exact_mut(2) {
            let index = (self.position >> FRAC_BITS) as usize;
            let fraction = self.position & FRAC_MASK;
            let s0 = fetch(index);
            let s1 = fetch(next_index(entry, index));
            let sample = s0 + (((s1 - s0) as i64 * fraction) >> FRAC_BITS) as i32;

            frame[0] = frame[0].saturating_add(left.apply(sample));
            frame[1] = frame[1].saturating_add(right.apply(sample));

            self.position += self.increment;
            left.advance();
            right.advance();
        }
    }
}

/// Second interpolation tap, kept inside the sample so no end padding is needed.
fn next_index(entry: &SampleEntry, index: usize) -> usize {
    let next = index + 1;
    match entry.loop_type() {
        LoopType::Forward if next == entry.loop_end() => entry.loop_begin(),
        LoopType::PingPong if next == entry.loop_end() => index,
        _ if next >= entry.length() => index,
        _ => next,
    }
}

/// A linear gain ramp in fixed point with [`VOL_FRAC_BITS`] fractional bits.
#[derive(Debug, Clone, Copy)]
struct Ramp {
    current: i64,
    step: i64,
}

impl Ramp {
    fn new(from: i32, to: i32, frames: usize) -> Self {
        Self {
            current: (from as i64) << VOL_FRAC_BITS,
            step: (((to - from) as i64) << VOL_FRAC_BITS) / frames as i64,
        }
    }

    fn apply(&self, sample: i32) -> i32 {
        ((sample as i64 * self.current) >> VOL_FRAC_BITS) as i32
    }

    fn advance(&mut self) {
        self.current += self.step;
    }

    fn skip(&mut self, frames: usize) {
        self.current += self.step * frames as i64;
    }
}
